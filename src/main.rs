use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rusty_scorecard::config::{Cli, ClientConfig, Command, load_config};
use rusty_scorecard::identity::{FileCredentialStore, IdentityResolver, JwtDecoder, TokenDecoder};
use rusty_scorecard::model::{HoleCount, RowId, ScorecardDraft};
use rusty_scorecard::view::grid::derive_grid;
use rusty_scorecard::view::markup::render_session;
use rusty_scorecard::{
    GridView, HttpScorecardClient, LoadOutcome, ScorecardApi, ScorecardSession, SessionStatus,
    create_scorecard,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let store = Arc::new(FileCredentialStore::new(&config.credential_file));
    let identity = IdentityResolver::new(
        store.clone(),
        Arc::new(JwtDecoder),
        config.credential_key.clone(),
    );
    let api: Arc<dyn ScorecardApi> = Arc::new(HttpScorecardClient::from_config(&config)?);

    match cli.command {
        Command::LoginToken { token } => {
            let claims = JwtDecoder.decode(&token).context("token is not a valid JWT")?;
            let user = claims
                .user_id()
                .ok_or_else(|| anyhow!("token carries no username"))?;
            store
                .set(&config.credential_key, &token)
                .with_context(|| format!("write {}", config.credential_file.display()))?;
            println!("Signed in as {user}");
        }
        Command::Show { html } => {
            let session = open_session(api, &identity, &config).await?;
            print_grid(&session.grid().unwrap_or_else(GridView::placeholder), &session.status(), html);
        }
        Command::Set {
            row,
            player,
            hole,
            value,
        } => {
            let session = open_session(api, &identity, &config).await?;
            let row = match (row, player) {
                (Some(0), _) => return Err(anyhow!("rows are numbered from 1")),
                (Some(n), _) => RowId(n - 1),
                (None, Some(name)) => session
                    .snapshot()
                    .ok_or_else(|| anyhow!("no scorecard loaded"))?
                    .row_of(&name)?,
                (None, None) => return Err(anyhow!("pass --row or --player")),
            };
            let grid = session.set_score(row, hole, &value)?;
            session
                .flush()
                .await
                .context("score kept locally but not saved")?;
            print_grid(&grid, &session.status(), false);
        }
        Command::Create {
            course,
            players,
            holes,
        } => {
            let user = identity
                .resolve_current_user()
                .ok_or_else(|| anyhow!("not signed in; run `scorecard login-token <token>`"))?;
            let mut draft = ScorecardDraft::new(user, course, HoleCount::try_from(holes)?);
            for player in &players {
                draft.add_player(player);
            }
            let created = create_scorecard(api.as_ref(), draft).await?;
            println!("Game created successfully!");
            print_grid(&derive_grid(&created), &SessionStatus::Ready, false);
        }
    }
    Ok(())
}

async fn open_session(
    api: Arc<dyn ScorecardApi>,
    identity: &IdentityResolver,
    config: &ClientConfig,
) -> Result<ScorecardSession> {
    let session = ScorecardSession::new(api);
    match session.load_current_user(identity).await {
        LoadOutcome::Loaded => Ok(session),
        LoadOutcome::Failed(e) => Err(anyhow::Error::new(e).context(format!(
            "could not load the latest scorecard from {}",
            config.base_url
        ))),
        LoadOutcome::NoIdentity => Err(anyhow!(
            "no credential under {} in {}; run `scorecard login-token <token>`",
            config.credential_key,
            config.credential_file.display()
        )),
        LoadOutcome::Superseded => Err(anyhow!("load was superseded")),
    }
}

fn print_grid(grid: &GridView, status: &SessionStatus, html: bool) {
    if html {
        println!("{}", render_session(grid, status).into_string());
    } else {
        print!("{}", grid.render_text());
        println!("({status})");
    }
}
