use serde_json::{json, Value};
use vid_crypto::ScryptParams;
use vid_engine::{Configuration, Context, Engine, EngineConfig};
use vid_vc::CredentialRequest;

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        scrypt: ScryptParams { log_n: 4, r: 8, p: 1 },
        ..EngineConfig::default()
    }
}

pub fn engine() -> Engine {
    Engine::new(fast_config()).unwrap()
}

pub fn session(engine: &Engine, client: &str) -> Context {
    engine
        .init(&Configuration::new(client, format!("{client}-secret")))
        .unwrap()
}

#[allow(dead_code)]
pub fn claims(value: Value) -> CredentialRequest {
    let Value::Object(claims) = value else {
        panic!("claims must be a JSON object");
    };
    CredentialRequest {
        claims,
        ..CredentialRequest::default()
    }
}

#[allow(dead_code)]
pub fn role(name: &str) -> CredentialRequest {
    claims(json!({ "role": name }))
}
