//! `agent-brain reset`: proxy `DELETE /index/`.

use crate::client::ApiClient;
use crate::error::CliResult;

pub async fn run(client: &ApiClient, json: bool) -> CliResult<()> {
    client.delete_empty("/index/").await?;
    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("index reset");
    }
    Ok(())
}
