use std::error::Error;

use clap::Parser;
use oidc_demo_client::clock::LocalClock;
use oidc_demo_client::commands::call::CallCommand;
use oidc_demo_client::commands::interactive::{InteractiveCommand, TerminalConfirm, stdin_lines};
use oidc_demo_client::endpoint::EndpointCaller;
use oidc_demo_client::expiry::ConfirmBeforeRelogin;
use oidc_demo_client::http::client::HttpClient;
use oidc_demo_client::parameters::{
    ClientArgs, Commands, build_auth_config, build_backend_url, build_http_config,
};
use oidc_demo_client::session::{Browser, ProvidedTokenSession};
use oidc_demo_client::user_info::UserInfo;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "oidc-demo-cli", version, about)]
struct Cli {
    #[command(flatten)]
    args: ClientArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Identity provider pages are printed for the user to open.
struct PrintBrowser;

impl Browser for PrintBrowser {
    fn open(&self, url: &Url) {
        println!("Open in your browser: {url}");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::from(cli.args.log_level))
        .init();

    let auth_config = build_auth_config(&cli.args.identity_provider)?;
    let backend_url = build_backend_url(&cli.args)?;
    let http_config = build_http_config(&cli.args)?;

    let http_client =
        HttpClient::new(http_config).map_err(|e| format!("error creating http client: {}", e))?;

    let session = ProvidedTokenSession::new(auth_config, cli.args.access_token, PrintBrowser);
    let user_info = UserInfo::new(
        session,
        EndpointCaller::new(http_client, LocalClock),
        backend_url,
    );

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Show => {
            print!("{}", user_info.render());
            Ok(())
        }
        Commands::Call { endpoints } => {
            for line in CallCommand::new(user_info).call(&endpoints)? {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Interactive => {
            let policy = ConfirmBeforeRelogin::new(TerminalConfirm);
            InteractiveCommand::new(user_info, policy).run(stdin_lines(), std::io::stdout())?;
            Ok(())
        }
    }
}
