use anyhow::Result;

use buy_btc::handler::{handle, InvocationRequest};
use buy_btc::logging::{log, obj, v_str, Domain, Level};
use buy_btc::secrets::ParameterSource;
use buy_btc::{server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let store = ParameterSource::from_name(&cfg.param_source)?.build(&cfg);
    let mode = std::env::args().nth(1).unwrap_or_else(|| "invoke".to_string());

    log(
        Level::Info,
        Domain::System,
        "start",
        obj(&[
            ("mode", v_str(&mode)),
            ("exchange", v_str(&cfg.exchange)),
            ("param_source", v_str(&cfg.param_source)),
        ]),
    );

    match mode.as_str() {
        "serve" => server::serve(cfg, store).await,
        "invoke" => {
            let resp = handle(&cfg, store.as_ref(), &InvocationRequest::default()).await;
            println!("{}", serde_json::to_string(&resp)?);
            if !resp.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        other => anyhow::bail!("unknown mode {:?}, expected `invoke` or `serve`", other),
    }
}
