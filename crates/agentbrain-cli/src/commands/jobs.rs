//! `agent-brain jobs [<id>] [--watch] [--cancel]`.

use std::time::Duration;

use crate::client::ApiClient;
use crate::error::CliResult;

pub struct JobsArgs {
    pub id: Option<String>,
    pub watch: bool,
    pub cancel: bool,
}

pub async fn run(client: &ApiClient, args: JobsArgs, json: bool) -> CliResult<()> {
    let Some(id) = args.id else {
        let jobs: serde_json::Value = client.get("/index/jobs/").await?;
        print_value(&jobs, json);
        return Ok(());
    };

    if args.cancel {
        let job: serde_json::Value = client.delete(&format!("/index/jobs/{id}")).await?;
        print_value(&job, json);
        return Ok(());
    }

    if args.watch {
        loop {
            let job: serde_json::Value = client.get(&format!("/index/jobs/{id}")).await?;
            print_value(&job, json);
            let status = job["status"].as_str().unwrap_or("");
            if matches!(status, "done" | "failed" | "cancelled") {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        return Ok(());
    }

    let job: serde_json::Value = client.get(&format!("/index/jobs/{id}")).await?;
    print_value(&job, json);
    Ok(())
}

fn print_value(value: &serde_json::Value, json: bool) {
    if json {
        println!("{value}");
    } else if let Some(jobs) = value.get("jobs").and_then(|j| j.as_array()) {
        for job in jobs {
            print_summary(job);
        }
    } else {
        print_summary(value);
    }
}

fn print_summary(job: &serde_json::Value) {
    println!(
        "{}  {}  {}",
        job["id"].as_str().unwrap_or("?"),
        job["status"].as_str().unwrap_or("?"),
        job["folder_path"].as_str().unwrap_or("?"),
    );
}
