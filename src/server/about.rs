//! Operator-facing diagnostic page

use std::path::Path;

use axum::{extract::State, response::Html};
use chrono::Local;

use super::SharedState;

const RELEASE_MARKER: &str = "const CACHE_NAME = 'wildrank-";

/// GET /about
pub async fn about(State(state): State<SharedState>) -> Html<String> {
    let app_dir = &state.config.store.app_dir;
    let git = read_lossy(&app_dir.join(".git").join("FETCH_HEAD"))
        .await
        .and_then(|head| git_commit_link(&head))
        .map(|(commit, url)| format!("Git: <a href=\"{}\">{}</a><br>", url, commit))
        .unwrap_or_default();
    let release = read_lossy(&app_dir.join("pwa.js"))
        .await
        .and_then(|script| release_name(&script).map(str::to_string))
        .map(|release| format!("Release: {}<br>", release))
        .unwrap_or_default();

    let now = Local::now();
    let uptime = (now - state.started_at).num_seconds().max(0) as u64;
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    Html(format!(
        "<!DOCTYPE html>\
<html lang=\"en\">\
<head><meta charset=\"utf-8\"/><title>WildRank</title></head>\
<body>\
<h1>WildRank</h1>\
wildrank-server {version}<br>\
2020-{year} <a href=\"https://wildstang.org\">WildStang Robotics Program</a><br>\
<a href=\"https://github.com/WildStang/WildRank\">MPL Licensed on GitHub</a><br>\
<br>\
Build: {commit} ({built})<br>\
Up Since: {since}<br>\
Uptime: {uptime}<br>\
Host: {hostname}<br>\
Port: {port}<br>\
{git}\
{release}\
</body>\
</html>",
        version = env!("CARGO_PKG_VERSION"),
        year = now.format("%Y"),
        commit = env!("GIT_COMMIT_SHORT"),
        built = env!("BUILD_TIMESTAMP"),
        since = state.started_at.format("%Y-%m-%d %H:%M:%S"),
        uptime = format_uptime(uptime),
        hostname = hostname,
        port = state.config.server.port,
        git = git,
        release = release,
    ))
}

async fn read_lossy(path: &Path) -> Option<String> {
    tokio::fs::read(path)
        .await
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Commit hash and web link from a `FETCH_HEAD` line such as
/// `abc123  branch 'main' of github.com:WildStang/WildRank`
fn git_commit_link(fetch_head: &str) -> Option<(String, String)> {
    let mut words = fetch_head.split_whitespace();
    let commit = words.next()?;
    let remote = words.last()?;
    // scp-style remotes (`host:owner/repo`) become a path
    let remote = if remote.contains("://") {
        remote.to_string()
    } else {
        remote.replace(':', "/")
    };
    let remote = remote.trim_end_matches(".git");

    let mut url = format!("{}/commit/{}", remote, commit);
    if !url.starts_with("http") {
        url = format!("https://{}", url);
    }
    Some((commit.to_string(), url))
}

/// Release tag from the service worker's cache name
fn release_name(script: &str) -> Option<&str> {
    let start = script.find(RELEASE_MARKER)? + RELEASE_MARKER.len();
    let len = script[start..].find('\'')?;
    Some(&script[start..start + len])
}

fn format_uptime(secs: u64) -> String {
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}
