//! # Request Dispatch
//!
//! Sends one or more JSON requests through the engine boundary and prints
//! each result buffer, releasing it afterwards. The file holds either a
//! single request object or an array of them, run in order on one session.
//!
//! ```bash
//! vid request flow.json --client-id alice --client-secret s3cret
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::Value;

use vid_engine::{EngineConfig, Request};

use crate::session::Session;
use crate::verdict_exit;

/// Request arguments.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// JSON file with a request object or an array of requests.
    pub file: PathBuf,

    /// Client id for the session.
    #[arg(long)]
    pub client_id: String,

    /// Client secret for the session.
    #[arg(long)]
    pub client_secret: String,
}

/// Run the requests in `args.file`.
pub fn run_request(args: &RequestArgs, config: EngineConfig) -> Result<u8> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let session = Session::open(config, &args.client_id, &args.client_secret)?;
    let mut code = 0;
    for output in dispatch_all(&session, &text)? {
        println!("{output}");
        if output.get("valid") == Some(&Value::Bool(false)) {
            code = verdict_exit(false);
        }
    }
    Ok(code)
}

/// Dispatch every request in `text` and collect the parsed results.
pub fn dispatch_all(session: &Session, text: &str) -> Result<Vec<Value>> {
    let requests: Vec<Request> = match serde_json::from_str::<Value>(text).context("request file is not JSON")? {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .context("malformed request")?,
        single => vec![serde_json::from_value(single).context("malformed request")?],
    };

    let mut outputs = Vec::with_capacity(requests.len());
    for request in requests {
        let op = request.op();
        let handle = session
            .engine
            .dispatch(&session.ctx, request)
            .with_context(|| format!("{op} failed"))?;
        let bytes = session.engine.read(handle);
        session.engine.dispose(handle)?;
        outputs.push(serde_json::from_slice(&bytes?)?);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_dispatches_a_request_array() {
        let session = Session::open(EngineConfig::default(), "alice", "s3cret").unwrap();
        let outputs = dispatch_all(
            &session,
            r#"[{"op":"create_did"},{"op":"multihash","content":"{\"k\":\"UNiD\"}"}]"#,
        )
        .unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0]["status"], "active");
        assert_eq!(outputs[1]["multihash"], "EiCV-xR1ReD5lj1xKLOGjRhlJIqIP17Pjum_CLVjRv9KDA");
        assert_eq!(session.engine.live_buffers(), 0);
    }

    #[test]
    fn test_failing_request_names_the_operation() {
        let session = Session::open(EngineConfig::default(), "alice", "s3cret").unwrap();
        let err = dispatch_all(&session, r#"{"op":"resolve_did"}"#).unwrap_err();
        assert!(format!("{err:#}").starts_with("resolve_did failed"));
    }

    #[test]
    fn test_negative_verification_exit_code() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"op":"digest_verify","content":"c","digest":"{}","secret":"k"}}"#,
            "00".repeat(32)
        )
        .unwrap();
        let args = RequestArgs {
            file: file.path().to_path_buf(),
            client_id: "alice".into(),
            client_secret: "s3cret".into(),
        };
        assert_eq!(run_request(&args, EngineConfig::default()).unwrap(), 2);
    }
}
