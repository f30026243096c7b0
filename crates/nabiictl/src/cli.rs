use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use nabii_client::{ClientOptions, ErrorHook, Nabii, NabiiV1};
use tracing::{info, warn};

pub const EXAMPLES: &str = r"
  # Check that the service answers
  $ nabiictl ping

  # Log in and print the current user
  $ nabiictl --url https://api.nabii.com login --email john@doe.com

  # Compare an application version with the latest release
  $ nabiictl version 1.2.0
";

#[derive(Debug, Parser)]
#[command(author, version, about = "Command line client for the Nabii service")]
#[command(after_help = format!(
    "Environment variables:\n  \
     NABII_URL_V1        Service base URL\n  \
     LOGIN_EMAIL_V1      Login email\n  \
     LOGIN_PASSWORD_V1   Login password\n  \
     NABII_LANG          Message language (fr, en)\n  \
     NABII_MODE          Service mode (production, test)\n\n\
     Examples:{EXAMPLES}"
))]
pub struct RootCommand {
    #[command(flatten)]
    pub args: RootArgs,

    #[command(subcommand)]
    pub action: SubCommands,
}

#[derive(Debug, Parser)]
pub struct RootArgs {
    /// Service base URL
    #[arg(long, value_name = "URL", env = "NABII_URL_V1")]
    pub url: Option<String>,

    /// Language of error messages
    #[arg(long, value_name = "LANG", env = "NABII_LANG")]
    pub lang: Option<String>,

    #[arg(long, value_name = "MODE", env = "NABII_MODE")]
    pub mode: Option<String>,

    /// Skip the realtime connection after login
    #[arg(long)]
    pub no_realtime: bool,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    /// Check that the service is reachable
    Ping,
    /// Log in, print the current user, then log out
    Login(LoginArgs),
    /// Check an application version against the latest release
    Version(VersionArgs),
}

#[derive(Debug, Parser)]
pub struct LoginArgs {
    #[arg(long, env = "LOGIN_EMAIL_V1")]
    pub email: String,

    #[arg(long, env = "LOGIN_PASSWORD_V1", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Parser)]
pub struct VersionArgs {
    /// Version name, e.g. 1.2.0
    pub name: String,

    #[command(flatten)]
    pub login: LoginArgs,
}

impl RootCommand {
    pub async fn run(self) -> Result<()> {
        let nabii = self.args.connect()?;

        match self.action {
            SubCommands::Ping => ping(&nabii).await,
            SubCommands::Login(args) => {
                let result = login(&nabii, &args).await;
                logout(&nabii).await;
                result
            }
            SubCommands::Version(args) => {
                let result = check_version(&nabii, &args).await;
                logout(&nabii).await;
                result
            }
        }
    }
}

impl RootArgs {
    fn connect(&self) -> Result<NabiiV1> {
        let mut options = ClientOptions {
            allow_realtime: !self.no_realtime,
            ..ClientOptions::default()
        };
        if let Some(url) = &self.url {
            options.url.clone_from(url);
        }

        let nabii = Nabii::new(options).wrap_err("Failed to build the client")?.v1;
        if let Some(lang) = &self.lang {
            nabii.set_lang(lang)?;
        }
        if let Some(mode) = &self.mode {
            nabii.set_mode(mode)?;
        }

        nabii.on_error(ErrorHook::new(|err| async move {
            warn!(status = ?err.status(), "{err}");
            Ok(())
        }));

        info!(url = %nabii.url(), lang = %nabii.lang(), mode = %nabii.mode(), "Client ready");
        Ok(nabii)
    }
}

async fn ping(nabii: &NabiiV1) -> Result<()> {
    if nabii.resolve().await {
        println!("{} is reachable", nabii.url());
        Ok(())
    } else {
        eyre::bail!("Can't reach {}", nabii.url())
    }
}

async fn login(nabii: &NabiiV1, args: &LoginArgs) -> Result<()> {
    let credentials = nabii.auth.login(&args.email, &args.password).await?;
    println!(
        "Logged in as {} {}",
        credentials.user.first_name, credentials.user.last_name
    );

    let me = nabii.auth.me().await?;
    println!("{}", serde_json::to_string_pretty(&me)?);
    Ok(())
}

async fn check_version(nabii: &NabiiV1, args: &VersionArgs) -> Result<()> {
    let _credentials = nabii
        .auth
        .login(&args.login.email, &args.login.password)
        .await?;

    let result = nabii.version.check(&args.name).await?;
    if result.is_latest {
        println!("{} is the latest version", result.current.name);
    } else {
        println!(
            "{} is outdated, latest is {} ({})",
            result.current.name,
            result.latest.name,
            result.latest.kind.as_str()
        );
    }
    Ok(())
}

async fn logout(nabii: &NabiiV1) {
    if let Err(err) = nabii.auth.logout().await {
        warn!(%err, "Logout failed");
    }
}
