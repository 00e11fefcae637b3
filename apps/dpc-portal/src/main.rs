mod config;
mod email;
mod handlers;
#[cfg(test)]
mod tests;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use dpc_gateway::{CpiApiGatewayClient, GatewayConfig};
use dpc_storage::{InvitationId, Store};
use dpc_store_sqlite::SqliteStore;
use dpc_verification::{
    AoVerificationService, VerificationSettings, VerifyAoJob, VerifyProviderOrganizationJob,
};

use config::PortalConfig;
use email::Mailer;
use handlers::{AoInvitationService, InvitationFlows};

#[derive(Parser)]
#[command(name = "dpc-portal")]
#[command(about = "DPC portal administration and verification jobs")]
struct Cli {
    /// Database URL (e.g. sqlite://dpc-portal.db)
    #[arg(long, global = true, env = "DATABASE_URL", default_value = "sqlite://dpc-portal.db")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-verify stale authorized official links (one bounded batch)
    VerifyAo,
    /// Re-verify stale provider organizations, re-running until caught up
    VerifyOrgs,
    /// Invitation management commands
    Invite {
        #[command(subcommand)]
        invite_cmd: InviteCommand,
    },
    /// Check that a gateway token can be obtained
    Healthcheck,
}

#[derive(Subcommand)]
enum InviteCommand {
    /// Invite an organization's authorized official by NPI
    Ao {
        #[arg(long)]
        npi: String,
        #[arg(long)]
        email: String,
    },
    /// Renew an expired authorized official invitation
    Renew {
        #[arg(long)]
        invitation_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = SqliteStore::open(&cli.database_url).await?;
    let portal_config = PortalConfig::from_env()?;
    let mailer = match portal_config.email.as_ref() {
        Some(email_config) => Some(Mailer::from_config(email_config)?),
        None => None,
    };

    match cli.command {
        Command::VerifyAo => {
            let gateway = CpiApiGatewayClient::new(GatewayConfig::from_env()?);
            let service = AoVerificationService::new(gateway);
            let job = VerifyAoJob::new(&store, &service, VerificationSettings::ao_from_env());
            let processed = job.run().await?;
            println!("verified {processed} authorized official link(s)");
        }
        Command::VerifyOrgs => {
            let gateway = CpiApiGatewayClient::new(GatewayConfig::from_env()?);
            let service = AoVerificationService::new(gateway);
            let job = VerifyProviderOrganizationJob::new(
                &store,
                &service,
                VerificationSettings::organization_from_env(),
            );
            let processed = job.run_to_completion().await?;
            println!("verified {processed} provider organization(s)");
        }
        Command::Invite { invite_cmd } => match invite_cmd {
            InviteCommand::Ao { npi, email } => {
                let gateway = CpiApiGatewayClient::new(GatewayConfig::from_env()?);
                let service = AoInvitationService::new(&store, &gateway, mailer.as_ref());
                let invitation = service.invite(&npi, &email).await?;
                println!("created invitation {}", invitation.id.0);
            }
            InviteCommand::Renew { invitation_id } => {
                let id = InvitationId(Uuid::parse_str(&invitation_id)?);
                let invitation = store.get_invitation(&id).await?;
                let gateway = CpiApiGatewayClient::new(GatewayConfig::from_env()?);
                let service = AoVerificationService::new(gateway);
                let flows = InvitationFlows::new(&store, &service, mailer.as_ref());
                match flows.renew(&invitation.provider_organization_id, &id).await? {
                    Some(replacement) => {
                        println!("created replacement invitation {}", replacement.id.0)
                    }
                    None => println!("invitation is not renewable"),
                }
            }
        },
        Command::Healthcheck => {
            let gateway = CpiApiGatewayClient::new(GatewayConfig::from_env()?);
            if gateway.healthcheck().await {
                println!("ok");
            } else {
                eprintln!("CPI API gateway unreachable");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
