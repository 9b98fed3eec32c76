use clap::{Arg, Command}; // Command-line argument parsing
use std::path::Path;
use std::process;

use paygate::auth::{authenticate_request, hash_password, validate_password, PasswordError};
use paygate::security::SigningKey;
use paygate::store::Money;
use paygate::utils::logging::initialize_logging;
use paygate::utils::time::{format_duration, format_timestamp, get_current_timestamp};
use paygate::{
    AuthError, AuthService, Config, PaymentError, PaymentService, Store, TokenIssuer, CONFIG_FILE,
};

fn main() {
    if let Err(e) = initialize_logging() {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Define the command-line interface using clap
    let matches = Command::new("paygate")
        .about("Session-token authentication and fixed-amount payment CLI")
        .subcommand(
            Command::new("seed")
                .about("Create an account (or reset its balance) for testing")
                .arg(Arg::new("username").help("The account username").required(true))
                .arg(
                    Arg::new("balance")
                        .long("balance")
                        .help("Opening balance, e.g. 8.00")
                        .value_name("AMOUNT")
                        .default_value("8.00"),
                ),
        )
        .subcommand(
            Command::new("login")
                .about("Authenticate and receive a session token")
                .arg(Arg::new("username").help("The account username").required(true)),
        )
        .subcommand(
            Command::new("logout")
                .about("Revoke the session token")
                .arg(
                    Arg::new("token")
                        .long("token")
                        .help("The session token to revoke")
                        .value_name("TOKEN")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("charge")
                .about("Debit the configured charge amount from the account")
                .arg(
                    Arg::new("token")
                        .long("token")
                        .help("A valid session token")
                        .value_name("TOKEN")
                        .required(true),
                ),
        )
        .get_matches();

    // Explicit assembly: config, signing secret, store, issuer, services.
    let config = Config::load_or_default(Path::new(CONFIG_FILE))?;

    let signing_key = SigningKey::new();
    signing_key.initialize_if_needed()?;
    let secret = signing_key.get_key()?;

    let store = Store::open(Path::new(&config.store_file))?;
    let issuer = TokenIssuer::new(&config.issuer, &config.audience, &secret);
    let auth = AuthService::new(&store, &issuer);
    let payments = PaymentService::new(&store, config.charge_amount);

    // Expired revocation entries are dead weight; sweep them on every run
    store.purge_expired_revocations(get_current_timestamp())?;

    // Handle the "seed" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("seed") {
        let username = sub_matches.get_one::<String>("username").expect("required arg");
        let balance = Money::parse(sub_matches.get_one::<String>("balance").expect("has default"))?;

        println!("Enter a password for {}:", username);
        let password = rpassword::read_password()?;
        if let Err(e) = validate_password(&password) {
            return Err(password_requirement(&e).into());
        }

        match store.find_user_by_username(username) {
            Some(user) => {
                store.set_balance(user.id, balance)?;
                println!("Account {} already exists; balance reset to {}", user.username, balance);
            }
            None => {
                let user = store.create_user(username, &hash_password(&password), balance)?;
                println!("Account {} created with balance {}", user.username, balance);
            }
        }
    }

    // Handle the "login" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("login") {
        let username = sub_matches.get_one::<String>("username").expect("required arg");

        println!("Enter password:");
        let password = rpassword::read_password()?;

        match auth.login(username, &password) {
            Ok(response) => {
                println!("Login successful.");
                println!("Token:      {}", response.token);
                println!("Expires at: {}", format_timestamp(response.expires_at));
            }
            Err(AuthError::AccountLocked { until }) => {
                let now = get_current_timestamp();
                println!(
                    "Account temporarily locked. Try again in {}.",
                    format_duration(until.saturating_sub(now))
                );
                process::exit(1);
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Handle the "logout" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("logout") {
        let token = sub_matches.get_one::<String>("token").expect("required arg");

        // The gate validates the token and checks revocation before any
        // claim is trusted; logout then revokes by token id
        let claims = authenticate_request(token, &issuer, &store)?;
        auth.logout(&claims)?;
        println!("Logged out.");
    }

    // Handle the "charge" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("charge") {
        let token = sub_matches.get_one::<String>("token").expect("required arg");

        let claims = authenticate_request(token, &issuer, &store)?;
        let user_id = claims
            .user_id()
            .ok_or(AuthError::InvalidToken("malformed subject claim".to_string()))?;

        match payments.charge(user_id) {
            Ok(receipt) => {
                println!("Payment successful.");
                println!("Payment id:  {}", receipt.payment_id);
                println!("New balance: {}", receipt.new_balance);
                println!("Timestamp:   {}", format_timestamp(receipt.timestamp));
            }
            Err(e @ PaymentError::Conflict) => {
                // Retryable: the caller decides whether to try again
                println!("{}", e);
                process::exit(1);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Map a password-strength violation to the message shown at seed time
fn password_requirement(error: &PasswordError) -> String {
    match error {
        PasswordError::TooShort => "password must be at least 8 characters".to_string(),
        PasswordError::NoUppercase => "password must contain an uppercase letter".to_string(),
        PasswordError::NoLowercase => "password must contain a lowercase letter".to_string(),
        PasswordError::NoNumber => "password must contain a number".to_string(),
        PasswordError::NoSpecialChar => "password must contain a special character".to_string(),
    }
}
