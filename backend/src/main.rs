//! `santa` command-line entry point.
//!
//! Each invocation runs one command against PostgreSQL, or against a
//! throwaway in-memory store with `--in-memory`. Results are printed as
//! `key=value` lines.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ortho_config::OrthoConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use santa_backend::config::SantaSettings;
use santa_backend::domain::ports::{
    AssignmentRepository, ParticipantRepository, UserLinkRepository,
};
use santa_backend::domain::{AssignmentError, AssignmentService, ChatUserId, PairingEngine};
use santa_backend::outbound::memory::InMemorySantaStore;
use santa_backend::outbound::persistence::{
    DbPool, DieselAssignmentRepository, DieselParticipantRepository, DieselUserLinkRepository,
    PoolConfig, run_migrations,
};
use santa_backend::telemetry;
use tokio::runtime::Builder;
use tracing::warn;

/// `santa` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "santa",
    about = "Draw and hand out Secret Santa assignments",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `SANTA_DATABASE_URL`, then
    /// `DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    /// Run against an in-memory store instead of PostgreSQL.
    #[arg(long = "in-memory", global = true)]
    in_memory: bool,
    /// Participant to seed the in-memory store with; repeat per name. The
    /// n-th participant is linked to chat user n.
    #[arg(long = "participant", value_name = "name", global = true)]
    participants: Vec<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Link a chat user to a participant by name.
    Register {
        /// Chat user id.
        #[arg(long = "user", value_name = "id")]
        user: i64,
        /// Participant name as registered.
        #[arg(long = "name", value_name = "name")]
        name: String,
    },
    /// Show the user's receiver, drawing the round if needed.
    Draw {
        /// Chat user id.
        #[arg(long = "user", value_name = "id")]
        user: i64,
    },
    /// Clear every assignment and user link. Administrators only.
    Reset {
        /// Chat user id of the administrator.
        #[arg(long = "user", value_name = "id")]
        user: i64,
    },
    /// List every committed pair.
    Overview,
    /// Print the current epoch state.
    Status,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    telemetry::init();
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = SantaSettings::load_from_iter([OsString::from("santa")])
        .map_err(|error| io::Error::other(format!("load configuration: {error}")))?;

    if args.in_memory {
        return run_in_memory(args, &settings).await;
    }

    let database_url = resolve_database_url(args.database_url, &settings)?;
    if matches!(args.command, Command::Migrate) {
        let applied = run_migrations(database_url)
            .await
            .map_err(io::Error::other)?;
        println!("applied_migrations={applied}");
        return Ok(());
    }

    let pool = DbPool::new(
        PoolConfig::new(&database_url).with_max_size(settings.pool_max_size()),
    )
    .await
    .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;

    let service = AssignmentService::new(
        Arc::new(DieselParticipantRepository::new(pool.clone())),
        Arc::new(DieselAssignmentRepository::new(pool.clone())),
        Arc::new(DieselUserLinkRepository::new(pool)),
        StdRng::from_os_rng(),
    );
    let service = configure(service, &settings);
    execute(&service, args.command).await
}

async fn run_in_memory(args: CliArgs, settings: &SantaSettings) -> io::Result<()> {
    if matches!(args.command, Command::Migrate) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "migrate needs a database; drop --in-memory",
        ));
    }

    let store = Arc::new(
        InMemorySantaStore::with_participants(&args.participants)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?,
    );
    let service = AssignmentService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        StdRng::from_os_rng(),
    );
    let service = configure(service, settings);

    for (user, name) in (1_i64..).zip(&args.participants) {
        service
            .register_user(ChatUserId::new(user), name)
            .await
            .map_err(|error| command_error("seed participant", &error))?;
    }
    execute(&service, args.command).await
}

fn configure<P, A, U>(
    service: AssignmentService<P, A, U, StdRng>,
    settings: &SantaSettings,
) -> AssignmentService<P, A, U, StdRng> {
    service
        .with_engine(PairingEngine::new(settings.max_pairing_attempts()))
        .with_admins(settings.admins())
        .with_commit_timeout(settings.commit_timeout())
}

async fn execute<P, A, U>(
    service: &AssignmentService<P, A, U, StdRng>,
    command: Command,
) -> io::Result<()>
where
    P: ParticipantRepository,
    A: AssignmentRepository,
    U: UserLinkRepository,
{
    match command {
        Command::Migrate => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "migrate is handled before the service starts",
        )),
        Command::Register { user, name } => {
            let participant = service
                .register_user(ChatUserId::new(user), &name)
                .await
                .map_err(|error| command_error("register", &error))?;
            println!("participant_id={}", participant.id());
            println!("participant={}", participant.name().display());
            Ok(())
        }
        Command::Draw { user } => {
            let outcome = service
                .request_assignment_for_user(ChatUserId::new(user))
                .await
                .map_err(|error| command_error("draw", &error))?;
            println!("giver={}", outcome.giver.name().display());
            println!("receiver={}", outcome.receiver.name().display());
            println!("newly_drawn={}", outcome.newly_drawn);
            Ok(())
        }
        Command::Reset { user } => {
            let cleared = service
                .reset_epoch_as(ChatUserId::new(user))
                .await
                .map_err(|error| command_error("reset", &error))?;
            println!("cleared_assignments={cleared}");
            Ok(())
        }
        Command::Overview => {
            let entries = service
                .round_overview()
                .await
                .map_err(|error| command_error("overview", &error))?;
            println!("pairs={}", entries.len());
            for entry in entries {
                println!(
                    "assignment={}->{}",
                    entry.giver.name().display(),
                    entry.receiver.name().display()
                );
            }
            Ok(())
        }
        Command::Status => {
            let state = service
                .epoch_state()
                .await
                .map_err(|error| command_error("status", &error))?;
            println!("epoch={state}");
            Ok(())
        }
    }
}

fn command_error(command: &str, error: &AssignmentError) -> io::Error {
    if error.is_retry_later() {
        warn!(command, error = %error, "command failed; retry later");
    }
    io::Error::other(format!("{command} failed: {error}"))
}

fn resolve_database_url(explicit: Option<String>, settings: &SantaSettings) -> io::Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "--database-url must not be empty when provided",
            ));
        }
        return Ok(value);
    }

    settings.database_url().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "database URL missing: set --database-url, SANTA_DATABASE_URL or DATABASE_URL",
        )
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for argument parsing helpers.

    use rstest::rstest;

    use super::*;

    fn settings(database_url: Option<&str>) -> SantaSettings {
        SantaSettings {
            database_url: database_url.map(str::to_owned),
            admin_ids: vec![1],
            max_pairing_attempts: 1000,
            commit_timeout_ms: 5000,
            pool_max_size: 10,
        }
    }

    #[rstest]
    fn explicit_database_url_wins() {
        let url = resolve_database_url(
            Some("postgres://cli/santa".to_owned()),
            &settings(Some("postgres://config/santa")),
        )
        .expect("url resolves");
        assert_eq!(url, "postgres://cli/santa");
    }

    #[rstest]
    fn blank_explicit_database_url_is_rejected() {
        let error = resolve_database_url(Some("  ".to_owned()), &settings(None))
            .expect_err("blank url");
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }

    #[rstest]
    fn configured_database_url_is_used() {
        let url = resolve_database_url(None, &settings(Some("postgres://config/santa")))
            .expect("url resolves");
        assert_eq!(url, "postgres://config/santa");
    }

    #[rstest]
    fn draw_arguments_parse() {
        let args = CliArgs::try_parse_from([
            "santa",
            "--in-memory",
            "--participant",
            "Anvar",
            "--participant",
            "Malika",
            "draw",
            "--user",
            "1",
        ])
        .expect("arguments parse");

        assert!(args.in_memory);
        assert_eq!(args.participants, vec!["Anvar", "Malika"]);
        assert!(matches!(args.command, Command::Draw { user: 1 }));
    }

    #[rstest]
    #[case(&["santa", "draw"])]
    #[case(&["santa", "register", "--user", "1"])]
    #[case(&["santa", "reset", "--user", "admin"])]
    fn incomplete_commands_are_rejected(#[case] argv: &[&str]) {
        assert!(CliArgs::try_parse_from(argv.iter().copied()).is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn in_memory_draw_runs_end_to_end() {
        let args = CliArgs::try_parse_from([
            "santa",
            "--in-memory",
            "--participant",
            "Anvar",
            "--participant",
            "Malika",
            "draw",
            "--user",
            "2",
        ])
        .expect("arguments parse");

        run_in_memory(args, &settings(None))
            .await
            .expect("draw succeeds");
    }

    #[rstest]
    #[case(1, true)]
    #[case(2, false)]
    #[tokio::test]
    async fn in_memory_reset_honours_the_admin_list(#[case] user: i64, #[case] allowed: bool) {
        let args = CliArgs::try_parse_from([
            "santa",
            "--in-memory",
            "--participant",
            "Anvar",
            "--participant",
            "Malika",
            "reset",
            "--user",
            &user.to_string(),
        ])
        .expect("arguments parse");

        let result = run_in_memory(args, &settings(None)).await;
        assert_eq!(result.is_ok(), allowed);
    }

    #[rstest]
    #[tokio::test]
    async fn in_memory_migrate_is_refused() {
        let args = CliArgs::try_parse_from(["santa", "--in-memory", "migrate"])
            .expect("arguments parse");

        let error = run_in_memory(args, &settings(None))
            .await
            .expect_err("no database");
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }
}
