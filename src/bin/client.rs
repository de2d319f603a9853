use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use zeroize::Zeroizing;

use passkeep::{Client, Error, validate};

#[derive(Debug, Parser)]
#[command(name = "passkeep")]
#[command(version, about = "passkeep console client")]
struct Cli {
    /// Server address
    #[arg(long, value_name = "ADDR", env = "PASSKEEP_SERVER", default_value = "127.0.0.1:8080")]
    server: String,

    /// Known-weak password list (one password per line). Falls back to a
    /// small built-in blocklist when absent.
    #[arg(long, value_name = "PATH", env = "PASSKEEP_WEAK_LIST")]
    weak_list: Option<PathBuf>,
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_secret(label: &str) -> Result<Zeroizing<String>> {
    Ok(Zeroizing::new(rpassword::prompt_password(format!(
        "{label}: "
    ))?))
}

fn print_seed_words(words: &[String]) {
    println!();
    println!("Your recovery phrase. Write it down now; it is shown only once:");
    println!();
    for (i, word) in words.iter().enumerate() {
        println!("  {:2}. {word}", i + 1);
    }
    println!();
}

fn report(result: Result<(), Error>) {
    match result {
        Ok(()) => {}
        Err(Error::Crypto) => println!("Wrong code word: the vault could not be decrypted."),
        Err(e) => println!("Error: {e}"),
    }
}

fn read_new_password(weak_list: Option<&PathBuf>) -> Result<Option<Zeroizing<String>>> {
    let password = prompt_secret("Password")?;
    if let Err(e) = validate::validate_password(&password) {
        println!("{e}");
        return Ok(None);
    }
    if validate::is_weak_password(&password, weak_list.map(|p| p.as_path())) {
        println!("That password is on the known-weak list; pick another.");
        return Ok(None);
    }
    let score = validate::password_strength(&password);
    println!(
        "Strength: {score}/100 ({})",
        validate::strength_description(score)
    );

    let confirm = prompt_secret("Confirm password")?;
    if *password != *confirm {
        println!("Passwords do not match.");
        return Ok(None);
    }
    Ok(Some(password))
}

fn register(client: &mut Client, weak_list: Option<&PathBuf>) -> Result<()> {
    let username = prompt("Username")?;
    if let Err(e) = validate::validate_username(&username) {
        println!("{e}");
        return Ok(());
    }
    let Some(password) = read_new_password(weak_list)? else {
        return Ok(());
    };
    let code_word = prompt_secret("Code word (encrypts your vault, never leaves this machine)")?;

    match client.register(&username, &password, &code_word) {
        Ok(words) => {
            print_seed_words(&words);
            println!("Registered and logged in as '{username}'.");
        }
        Err(e) => println!("Registration failed: {e}"),
    }
    Ok(())
}

fn login(client: &mut Client) -> Result<()> {
    let username = prompt("Username")?;
    let password = prompt_secret("Password")?;
    let code_word = prompt_secret("Code word")?;

    match client.login(&username, &password, &code_word) {
        Ok(()) => println!("Logged in as '{username}'."),
        Err(Error::Crypto) => {
            println!("Wrong code word: the vault could not be decrypted.")
        }
        Err(e) => println!("Login failed: {e}"),
    }
    Ok(())
}

fn recover(client: &mut Client, weak_list: Option<&PathBuf>) -> Result<()> {
    let username = prompt("Username")?;
    let seed_phrase = prompt("Recovery phrase (12 words)")?;
    let Some(password) = read_new_password(weak_list)? else {
        return Ok(());
    };
    let code_word = prompt_secret("Code word")?;

    match client.recover_password(&username, &seed_phrase, &password, &code_word) {
        Ok(words) => {
            println!("Password recovered. A new recovery phrase was issued:");
            print_seed_words(&words);
        }
        Err(Error::Crypto) => println!("Wrong code word; nothing was changed."),
        Err(e) => println!("Recovery failed: {e}"),
    }
    Ok(())
}

fn change_password(client: &mut Client, weak_list: Option<&PathBuf>) -> Result<()> {
    let seed_phrase = prompt("Recovery phrase (12 words)")?;
    let Some(password) = read_new_password(weak_list)? else {
        return Ok(());
    };
    let code_word = prompt_secret("Code word")?;

    match client.change_password(&seed_phrase, &password, &code_word) {
        Ok(words) => {
            println!("Password changed. A new recovery phrase was issued:");
            print_seed_words(&words);
        }
        Err(Error::Crypto) => println!("Wrong code word; nothing was changed."),
        Err(e) => println!("Password change failed: {e}"),
    }
    Ok(())
}

fn list_entries(client: &Client) -> Result<()> {
    let entries = client.vault_entries()?;
    if entries.is_empty() {
        println!("Vault is empty.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{} / {}  password: {}  url: {}  note: {}  (modified {})",
            entry.service, entry.login, entry.password, entry.url, entry.note, entry.last_modified
        );
    }
    Ok(())
}

fn add_entry(client: &mut Client) -> Result<()> {
    let service = prompt("Service")?;
    let login = prompt("Login for that service")?;
    let password = prompt("Password (empty to generate)")?;
    let password = if password.is_empty() {
        let generated = validate::generate_password(16, true, true, true)?;
        println!("Generated: {generated}");
        generated
    } else {
        password
    };
    let url = prompt("URL")?;
    let note = prompt("Note")?;

    client.add_entry(&service, &login, &password, &url, &note)?;
    println!("Entry saved locally; use sync to upload.");
    Ok(())
}

fn update_entry(client: &mut Client) -> Result<()> {
    let service = prompt("Service")?;
    let login = prompt("Login for that service")?;
    let password = prompt("New password")?;
    let url = prompt("New URL")?;
    let note = prompt("New note")?;
    report(client.update_entry(&service, &login, &password, &url, &note));
    Ok(())
}

fn delete_entry(client: &mut Client) -> Result<()> {
    let service = prompt("Service")?;
    let login = prompt("Login for that service")?;
    report(client.delete_entry(&service, &login));
    Ok(())
}

fn generate() -> Result<()> {
    let length: usize = prompt("Length")?.parse().unwrap_or(16);
    let password = validate::generate_password(length.clamp(4, 128), true, true, true)?;
    let score = validate::password_strength(&password);
    println!(
        "{password}  ({score}/100, {})",
        validate::strength_description(score)
    );
    Ok(())
}

fn logged_out_menu(client: &mut Client, weak_list: Option<&PathBuf>) -> Result<bool> {
    println!();
    println!("1) register  2) login  3) recover password  4) check user  5) quit");
    match prompt("> ")?.as_str() {
        "1" => register(client, weak_list)?,
        "2" => login(client)?,
        "3" => recover(client, weak_list)?,
        "4" => {
            let username = prompt("Username")?;
            match client.check_user(&username) {
                Ok(true) => println!("'{username}' exists."),
                Ok(false) => println!("'{username}' does not exist."),
                Err(e) => println!("Error: {e}"),
            }
        }
        "5" | "q" => return Ok(false),
        _ => println!("Unknown choice."),
    }
    Ok(true)
}

fn logged_in_menu(client: &mut Client, weak_list: Option<&PathBuf>) -> Result<bool> {
    println!();
    println!(
        "[{}]  1) list  2) add  3) update  4) delete  5) generate password  \
         6) change password  7) sync  8) logout  9) quit",
        client.username().unwrap_or("?")
    );
    match prompt("> ")?.as_str() {
        "1" => list_entries(client)?,
        "2" => add_entry(client)?,
        "3" => update_entry(client)?,
        "4" => delete_entry(client)?,
        "5" => generate()?,
        "6" => change_password(client, weak_list)?,
        "7" => match client.sync_to_server() {
            Ok(()) => println!("Synced."),
            Err(e) => println!("Sync failed: {e}"),
        },
        "8" => match client.logout() {
            Ok(()) => println!("Logged out."),
            Err(e) => println!("Sync failed, session kept: {e}"),
        },
        "9" | "q" => {
            if let Err(e) = client.logout() {
                println!("Sync failed on exit: {e}");
            }
            return Ok(false);
        }
        _ => println!("Unknown choice."),
    }
    Ok(true)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut client = Client::new(cli.server.clone());
    println!("passkeep client — server {}", cli.server);

    loop {
        let keep_going = if client.is_logged_in() {
            logged_in_menu(&mut client, cli.weak_list.as_ref())?
        } else {
            logged_out_menu(&mut client, cli.weak_list.as_ref())?
        };
        if !keep_going {
            break;
        }
    }
    Ok(())
}
