use anyhow::{anyhow, bail, Error};
use debtbook::{
    endpoints::{self, Contact, ContactForm, ContactKind},
    Access, ApiClient, Config, FileStore, Identity, SessionManager,
};
use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::from_args();

    log::debug!("Using the API at {}", args.api_base);

    let config = Config::new(args.api_base.clone());
    let api = ApiClient::new(&config)?;
    let store = Arc::new(FileStore::new(&args.state_dir));
    let session = SessionManager::new(api, store);

    // pick up where the last run left off
    session.initialize().await;

    match args.command {
        Command::Login { email, password } => {
            session.login(&email, &password).await?;
            whoami(&session)
        },
        Command::Register {
            name,
            email,
            password,
        } => {
            session.register(&name, &email, &password).await?;
            whoami(&session)
        },
        Command::Logout => {
            session.logout();
            println!("Signed out");
            Ok(())
        },
        Command::Whoami => whoami(&session),
        Command::Dashboard => dashboard(&session).await,
        Command::Clients(cmd) => contacts(&session, ContactKind::Client, cmd).await,
        Command::Suppliers(cmd) => {
            contacts(&session, ContactKind::Supplier, cmd).await
        },
    }
}

fn signed_in(session: &SessionManager) -> Result<Identity, Error> {
    match Access::of(&session.session()) {
        Access::Granted(user) => Ok(user.clone()),
        _ => bail!("Not signed in, run `debtbook login` first"),
    }
}

fn whoami(session: &SessionManager) -> Result<(), Error> {
    let user = signed_in(session)?;
    println!("Signed in as {} <{}>", user.display_name, user.email);

    Ok(())
}

async fn dashboard(session: &SessionManager) -> Result<(), Error> {
    let user = signed_in(session)?;
    let stats = session
        .authorized(|api| async move { endpoints::dashboard::stats(&api).await })
        .await?;

    println!("Welcome back, {}!", user.display_name);
    println!("Money owed to me: €{:.2}", stats.total_money_owed_to_me);
    println!("Money I owe:      €{:.2}", stats.total_money_i_owe);
    println!("Net position:     €{:.2}", stats.net_position);
    println!(
        "{} clients, {} suppliers",
        stats.total_clients, stats.total_suppliers
    );

    for contact in stats.recent_clients.iter().chain(&stats.recent_suppliers) {
        print_contact(contact);
    }

    Ok(())
}

async fn contacts(
    session: &SessionManager,
    kind: ContactKind,
    cmd: ContactCommand,
) -> Result<(), Error> {
    signed_in(session)?;

    match cmd {
        ContactCommand::List { search } => {
            let found = session
                .authorized(|api| async move {
                    endpoints::contacts::list(&api, kind, search.as_deref())
                        .await
                })
                .await?;

            for contact in &found {
                print_contact(contact);
            }
        },
        ContactCommand::Add(fields) => {
            let draft = ContactForm::from(fields).validate()?;
            session
                .authorized(|api| async move {
                    endpoints::contacts::create(&api, kind, &draft).await
                })
                .await
                .map_err(|e| anyhow!(kind.save_failure(&e)))?;

            println!("Saved the {}", kind.noun());
        },
        ContactCommand::Edit { id, fields } => {
            let draft = ContactForm::from(fields).validate()?;
            session
                .authorized(|api| async move {
                    endpoints::contacts::update(&api, kind, &id, &draft).await
                })
                .await
                .map_err(|e| anyhow!(kind.save_failure(&e)))?;

            println!("Saved the {}", kind.noun());
        },
        ContactCommand::Delete { id } => {
            session
                .authorized(|api| async move {
                    endpoints::contacts::delete(&api, kind, &id).await
                })
                .await?;

            println!("Deleted the {}", kind.noun());
        },
    }

    Ok(())
}

fn print_contact(contact: &Contact) {
    println!(
        "{}\t{}\t{}\t{}\t€{:.2}",
        contact.id,
        contact.name,
        contact.phone.as_deref().unwrap_or("-"),
        contact.email.as_deref().unwrap_or("-"),
        contact.amount_owed,
    );
}

#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(
        long = "api-base",
        env = "DEBTBOOK_API_BASE",
        default_value = "http://localhost:8000",
        help = "Where the bookkeeping API lives"
    )]
    api_base: Url,
    #[structopt(
        long = "state-dir",
        env = "DEBTBOOK_STATE_DIR",
        default_value = ".debtbook",
        parse(from_os_str),
        help = "Where to keep the session between runs"
    )]
    state_dir: PathBuf,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Sign in to your account
    Login {
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
    },
    /// Create a new account and sign in to it
    Register {
        #[structopt(short = "n", long = "name")]
        name: String,
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
    },
    /// Forget the current session
    Logout,
    /// Show who you are signed in as
    Whoami,
    /// Show how much you are owed and how much you owe
    Dashboard,
    /// People who owe you money
    Clients(ContactCommand),
    /// People you owe money to
    Suppliers(ContactCommand),
}

#[derive(Debug, StructOpt)]
enum ContactCommand {
    List {
        #[structopt(short = "s", long = "search")]
        search: Option<String>,
    },
    Add(ContactFields),
    Edit {
        id: String,
        #[structopt(flatten)]
        fields: ContactFields,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, StructOpt)]
struct ContactFields {
    #[structopt(long = "name")]
    name: String,
    #[structopt(long = "phone", default_value = "")]
    phone: String,
    #[structopt(long = "email", default_value = "")]
    email: String,
    #[structopt(long = "amount-owed", default_value = "")]
    amount_owed: String,
    #[structopt(long = "notes", default_value = "")]
    notes: String,
}

impl From<ContactFields> for ContactForm {
    fn from(fields: ContactFields) -> ContactForm {
        ContactForm {
            name: fields.name,
            phone: fields.phone,
            email: fields.email,
            amount_owed: fields.amount_owed,
            notes: fields.notes,
        }
    }
}
