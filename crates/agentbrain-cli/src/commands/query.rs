//! `agent-brain query <text>`: proxy `POST /query/`.

use serde::Serialize;

use crate::client::ApiClient;
use crate::error::CliResult;

#[derive(Debug, Serialize)]
pub struct QueryArgs {
    pub text: String,
    pub mode: String,
    pub top_k: usize,
}

pub async fn run(client: &ApiClient, args: QueryArgs, json: bool) -> CliResult<()> {
    let body = serde_json::json!({
        "query": args.text,
        "mode": args.mode,
        "top_k": args.top_k,
    });
    let response: serde_json::Value = client.post("/query/", &body).await?;

    if json {
        println!("{response}");
        return Ok(());
    }

    let matches = response["matches"].as_array().cloned().unwrap_or_default();
    if matches.is_empty() {
        println!("no matches");
    }
    for (i, m) in matches.iter().enumerate() {
        let path = m["metadata"]["file_path"].as_str().unwrap_or("?");
        let score = m["score"].as_f64().unwrap_or(0.0);
        println!("{}. {path} ({score:.3})", i + 1);
        if let Some(text) = m["text"].as_str() {
            let preview: String = text.lines().take(3).collect::<Vec<_>>().join("\n   ");
            println!("   {preview}");
        }
    }
    Ok(())
}
