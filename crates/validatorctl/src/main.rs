use anyhow::{bail, Context};
use archive_validator_core::api::{
    AnyContent, BeginTransactionResponse, EndTransactionRequest, ErrorBody, ModuleDefinition,
    ProcessRequest, ProcessResponse, ValidateRequest, ValidateResponse,
};
use archive_validator_core::definition::{INPUT_ARCHIVE, INPUT_DIGEST, INPUT_OPERATION};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use reqwest::Response;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "validatorctl")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the daemon's module definition.
    Definition {
        #[arg(long)]
        daemon: String,
    },
    /// Validate an archive in a single call.
    Validate {
        #[arg(long)]
        daemon: String,
        #[arg(long)]
        archive: String,
        #[arg(long)]
        digest: String,
    },
    /// Walk a full session: begin, initialise, upload, report, end.
    Session {
        #[arg(long)]
        daemon: String,
        #[arg(long)]
        archive: String,
        #[arg(long)]
        digest: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();

    match args.cmd {
        Cmd::Definition { daemon } => {
            let url = format!("{}/v1/definition", daemon.trim_end_matches('/'));
            let resp: ModuleDefinition = checked(client.get(url).send().await?)
                .await?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Cmd::Validate {
            daemon,
            archive,
            digest,
        } => {
            let encoded = read_archive(&archive).await?;
            let req = ValidateRequest {
                session_id: None,
                inputs: vec![
                    AnyContent::base64(INPUT_ARCHIVE, encoded),
                    AnyContent::string(INPUT_DIGEST, digest),
                ],
            };
            let url = format!("{}/v1/validate", daemon.trim_end_matches('/'));
            let resp: ValidateResponse = checked(client.post(url).json(&req).send().await?)
                .await?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Cmd::Session {
            daemon,
            archive,
            digest,
        } => {
            let base = daemon.trim_end_matches('/');
            let encoded = read_archive(&archive).await?;

            let begin: BeginTransactionResponse =
                checked(client.post(format!("{base}/v1/transactions")).send().await?)
                    .await?
                    .json()
                    .await?;
            let session_id = begin.session_id;
            eprintln!("session {session_id}");

            let outcome = run_session(&client, base, &session_id, encoded, digest).await;

            let end = EndTransactionRequest {
                session_id: Some(session_id.clone()),
            };
            let ended = client
                .post(format!("{base}/v1/transactions/end"))
                .json(&end)
                .send()
                .await;
            if let Err(e) = ended {
                eprintln!("failed to end session {session_id}: {e}");
            }

            println!("{}", serde_json::to_string_pretty(&outcome?)?);
        }
    }

    Ok(())
}

async fn run_session(
    client: &reqwest::Client,
    base: &str,
    session_id: &str,
    encoded: String,
    digest: String,
) -> anyhow::Result<Value> {
    let init = ProcessRequest {
        session_id: Some(session_id.to_string()),
        operation: None,
        inputs: vec![
            AnyContent::base64(INPUT_ARCHIVE, encoded),
            AnyContent::string(INPUT_DIGEST, digest),
        ],
    };
    let _: ProcessResponse = checked(
        client
            .post(format!("{base}/v1/process"))
            .json(&init)
            .send()
            .await?,
    )
    .await?
    .json()
    .await?;

    let mut steps = serde_json::Map::new();
    for step in ["upload", "report"] {
        let req = ValidateRequest {
            session_id: Some(session_id.to_string()),
            inputs: vec![AnyContent::string(INPUT_OPERATION, step)],
        };
        let resp: ValidateResponse = checked(
            client
                .post(format!("{base}/v1/validate"))
                .json(&req)
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        steps.insert(step.to_string(), serde_json::to_value(resp.report)?);
    }
    Ok(Value::Object(steps))
}

async fn read_archive(path: &str) -> anyhow::Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read archive {path}"))?;
    Ok(STANDARD.encode(bytes))
}

/// Passes successful responses through; turns error responses into an error
/// carrying the daemon's message.
async fn checked(resp: Response) -> anyhow::Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => bail!("daemon returned {status}: {}", body.error),
        Err(_) => bail!("daemon returned {status}: {text}"),
    }
}
