use clap::{Arg, ArgMatches, Command};
use itertools::Itertools;
use log::{error, info, warn};
use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use sat_portal_identity::admin::{AdminDirectory, BootstrapReport, CredentialBootstrap};
use sat_portal_identity::auth::password::read_password;
use sat_portal_identity::auth::{validate_password, PasswordHasher, Pbkdf2Hasher};
use sat_portal_identity::email::{
    notifier_for, resolve_mail_password, send_configuration_test, setup_mail_account, SmtpNotifier,
};
use sat_portal_identity::otp::{DeliveryOutcome, OtpDispatcher, OtpLedger, OtpPurpose};
use sat_portal_identity::utils::io::prompt_with_confirmation;
use sat_portal_identity::utils::time::format_timestamp;
use sat_portal_identity::utils::{initialize_logging, Clock, SystemClock};
use sat_portal_identity::{IdentityError, PortalConfig, Store, CONFIG_FILE, STORE_KEY_ENV};

type CliResult = Result<(), Box<dyn Error>>;

/// Services wired from the configuration, shared by every subcommand
struct Portal {
    config: PortalConfig,
    config_path: PathBuf,
    bootstrap: CredentialBootstrap,
    directory: AdminDirectory,
    ledger: Arc<OtpLedger>,
    startup: BootstrapReport,
}

fn cli() -> Command {
    Command::new("sat-portal")
        .about("SAT Portal identity tools: admin credentials and one-time codes")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .default_value(CONFIG_FILE)
                .help("Path to the portal configuration file"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("bootstrap").about("Create missing admin accounts from the static table"))
        .subcommand(
            Command::new("admin-login")
                .about("Log in as a department admin")
                .arg(Arg::new("id").help("Employee ID, e.g. admin@cse").required(true)),
        )
        .subcommand(
            Command::new("admin-password")
                .about("Change an admin's password")
                .arg(Arg::new("id").help("Employee ID").required(true)),
        )
        .subcommand(Command::new("admin-list").about("List provisioned admin accounts"))
        .subcommand(
            Command::new("admin-remove")
                .about("Delete an admin account")
                .arg(Arg::new("id").help("Employee ID").required(true)),
        )
        .subcommand(
            Command::new("otp-send")
                .about("Issue and email a one-time code")
                .arg(Arg::new("email").help("Recipient address").required(true))
                .arg(purpose_arg()),
        )
        .subcommand(
            Command::new("otp-verify")
                .about("Verify and consume a one-time code")
                .arg(Arg::new("email").help("Recipient address").required(true))
                .arg(Arg::new("code").help("The 6-digit code").required(true))
                .arg(purpose_arg()),
        )
        .subcommand(Command::new("mail-setup").about("Configure the outgoing mail account"))
        .subcommand(
            Command::new("mail-test")
                .about("Send a test email with the configured account")
                .arg(Arg::new("to").help("Recipient address").required(true)),
        )
}

fn purpose_arg() -> Arg {
    Arg::new("purpose")
        .long("purpose")
        .default_value("registration")
        .help("registration or reset_password")
}

fn main() {
    let matches = cli().get_matches();

    if let Err(e) = run(&matches) {
        match e.downcast_ref::<IdentityError>() {
            Some(identity_error) => eprintln!("Error [{}]: {}", identity_error.kind(), identity_error),
            None => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> CliResult {
    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let portal = open_portal(&config_path)?;

    match matches.subcommand() {
        Some(("bootstrap", _)) => handle_bootstrap(&portal),
        Some(("admin-login", sub)) => handle_admin_login(&portal, required(sub, "id")?),
        Some(("admin-password", sub)) => handle_admin_password(&portal, required(sub, "id")?),
        Some(("admin-list", _)) => handle_admin_list(&portal),
        Some(("admin-remove", sub)) => handle_admin_remove(&portal, required(sub, "id")?),
        Some(("otp-send", sub)) => handle_otp_send(
            &portal,
            required(sub, "email")?,
            required(sub, "purpose")?.parse()?,
        ),
        Some(("otp-verify", sub)) => handle_otp_verify(
            &portal,
            required(sub, "email")?,
            required(sub, "code")?,
            required(sub, "purpose")?.parse()?,
        ),
        Some(("mail-setup", _)) => handle_mail_setup(portal),
        Some(("mail-test", sub)) => handle_mail_test(&portal, required(sub, "to")?),
        _ => Err("Unknown command. Run with --help for usage.".into()),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, Box<dyn Error>> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing argument: {}", name).into())
}

/// Load configuration, start logging, open the store and run the startup bootstrap
fn open_portal(config_path: &Path) -> Result<Portal, Box<dyn Error>> {
    let config = PortalConfig::load(config_path)?;
    initialize_logging(config.log.file.as_deref(), &config.log.level)?;
    if !config_path.exists() {
        warn!(
            "No configuration at {}; running with defaults and no static admins",
            config_path.display()
        );
    }

    let passphrase = if config.store.encrypt {
        let key = env::var(STORE_KEY_ENV)
            .map_err(|_| format!("store.encrypt is set but {} is not", STORE_KEY_ENV))?;
        Some(key)
    } else {
        None
    };
    let store = Arc::new(Store::file(config.store.path.clone(), passphrase));
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Pbkdf2Hasher::new(config.admins.password_rounds));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let bootstrap = CredentialBootstrap::new(
        store.clone(),
        hasher.clone(),
        clock.clone(),
        config.admins.credentials.clone(),
        &config.admins.email_domain,
    );
    let startup = bootstrap.run_at_startup();

    let ledger = Arc::new(
        OtpLedger::new(store.clone(), clock).with_ttl(chrono::Duration::minutes(config.otp.ttl_minutes)),
    );

    Ok(Portal {
        directory: AdminDirectory::new(store, hasher),
        config_path: config_path.to_path_buf(),
        config,
        bootstrap,
        ledger,
        startup,
    })
}

fn handle_bootstrap(portal: &Portal) -> CliResult {
    let report = &portal.startup;
    if report.aborted {
        return Err("Bootstrap failed; see the log. Admins are still created on first login.".into());
    }

    for employee_id in &report.created {
        println!("Created admin account: {}", employee_id);
    }
    println!(
        "{} created, {} already provisioned, {} in static table",
        report.created.len(),
        report.already_provisioned,
        portal.bootstrap.table().len()
    );
    Ok(())
}

fn handle_admin_login(portal: &Portal, employee_id: &str) -> CliResult {
    println!("Password for {}:", employee_id);
    let password = read_password()?;

    let session = portal.bootstrap.login(employee_id, &password)?;
    println!(
        "Welcome, {} ({}, {})",
        session.account.display_name,
        session.account.branch,
        session.role.as_str()
    );
    if session.provisioned_now {
        println!("Your account was created from the default password. Change it with `admin-password`.");
    }
    Ok(())
}

fn handle_admin_password(portal: &Portal, employee_id: &str) -> CliResult {
    println!("Current password for {}:", employee_id);
    let current = read_password()?;
    portal.bootstrap.login(employee_id, &current)?;

    println!("New password:");
    let new_password = read_password()?;
    validate_password(&new_password).map_err(IdentityError::from)?;

    println!("Confirm new password:");
    if read_password()? != new_password {
        return Err(IdentityError::InvalidInput("Passwords do not match".to_string()).into());
    }

    portal.directory.change_password(employee_id, &new_password)?;
    println!("Password updated for {}", employee_id);
    Ok(())
}

fn handle_admin_list(portal: &Portal) -> CliResult {
    let accounts = portal.directory.list()?;
    if accounts.is_empty() {
        println!("No admin accounts.");
        return Ok(());
    }

    for (branch, group) in &accounts.iter().group_by(|a| a.branch.as_str()) {
        println!("{}", branch);
        for account in group {
            println!(
                "  {:<16} {:<32} created {}",
                account.employee_id,
                account.email,
                format_timestamp(account.created_at)
            );
        }
    }
    Ok(())
}

fn handle_admin_remove(portal: &Portal, employee_id: &str) -> CliResult {
    let account = portal.directory.get(employee_id)?;
    let confirmed = prompt_with_confirmation(
        &format!("Remove {} ({})?", account.employee_id, account.branch),
        "It will be recreated from the static table on next startup. Continue",
    )?;
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    portal.directory.remove(employee_id)?;
    info!("Admin account removed via CLI");
    println!("Removed {}", employee_id);
    Ok(())
}

fn handle_otp_send(portal: &Portal, recipient: &str, purpose: OtpPurpose) -> CliResult {
    let dispatcher = OtpDispatcher::new(
        portal.ledger.clone(),
        notifier_for(&portal.config.mail, resolve_mail_password().as_deref()),
        portal.config.mail.dev_fallback,
    );

    match dispatcher.send_code(recipient, purpose)? {
        DeliveryOutcome::Sent => println!("OTP sent to {}", recipient),
        DeliveryOutcome::LoggedFallback => {
            println!("Email delivery failed; the OTP was written to the log (dev mode)")
        }
    }
    Ok(())
}

fn handle_otp_verify(portal: &Portal, recipient: &str, code: &str, purpose: OtpPurpose) -> CliResult {
    portal.ledger.verify(recipient, code, purpose)?;
    println!("OTP verified");
    Ok(())
}

fn handle_mail_setup(mut portal: Portal) -> CliResult {
    setup_mail_account(&mut portal.config.mail)?;
    portal.config.save(&portal.config_path)?;
    info!("Mail settings saved to {}", portal.config_path.display());
    Ok(())
}

fn handle_mail_test(portal: &Portal, recipient: &str) -> CliResult {
    if !portal.config.mail.is_configured() {
        return Err("Mail is not configured. Run `mail-setup` first.".into());
    }
    let password = resolve_mail_password().ok_or("No SMTP password found. Run `mail-setup` first.")?;
    let notifier = SmtpNotifier::new(portal.config.mail.clone(), &password);

    println!("SMTP Server: {}", portal.config.mail.resolved_host());
    println!("SMTP Port: {}", portal.config.mail.port);
    println!("Username: {}", portal.config.mail.username);

    if let Err(e) = send_configuration_test(&notifier, recipient) {
        error!("Mail configuration test failed: {}", e);
        return Err(e.into());
    }
    println!("Test email sent successfully to: {}", recipient);
    Ok(())
}
