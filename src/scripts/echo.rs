use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use scripthost_protocols::ScriptError;
use scripthost_runtime::{Script, ScriptEnv};

/// WebSocket echo.
///
/// `exit` ends the session, `panic` fails it and `date` replies with the
/// current time.
pub struct Echo;

#[async_trait]
impl Script for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run(&self, env: ScriptEnv) -> Result<(), ScriptError> {
        let ws = env.websocket()?;
        loop {
            let data = ws.read_text().await?;
            match data.as_str() {
                "exit" => return Err(env.exit()),
                "panic" => return Err(ScriptError::failed("panic requested by client")),
                "date" => {
                    ws.write_text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
                        .await?
                }
                _ => ws.write_text(format!("received: {}", data)).await?,
            }
        }
    }
}
