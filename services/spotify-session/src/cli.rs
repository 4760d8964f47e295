//! Command-line parsing
//!
//! `spotify-session [--config <path>] <command> [args]`

use anyhow::{Result, bail};
use reqwest::Method;

pub const USAGE: &str = "\
usage: spotify-session [--config <path>] <command>

commands:
  login                           print the authorization URL to open
  callback <url>                  finish login with the URL the browser landed on
  status                          show the current authorization state
  me                              show the signed-in profile
  now-playing                     show the currently playing track
  track <id>                      show a track by id
  request [--method <M>] <path>   call an arbitrary API path
  logout                          forget all stored credentials";

#[derive(Debug, PartialEq)]
pub enum Command {
    Login,
    Callback(String),
    Status,
    Me,
    NowPlaying,
    Track(String),
    Request { method: Method, path: String },
    Logout,
}

#[derive(Debug, PartialEq)]
pub struct Invocation {
    pub config_path: Option<String>,
    pub command: Command,
}

/// Parse arguments (without the program name).
pub fn parse(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut method = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(p) => config_path = Some(p.clone()),
                None => bail!("--config needs a path\n\n{USAGE}"),
            },
            "--method" => match iter.next() {
                Some(m) => method = Some(m.to_ascii_uppercase()),
                None => bail!("--method needs a value\n\n{USAGE}"),
            },
            _ => positional.push(arg.as_str()),
        }
    }

    let command = match positional.as_slice() {
        ["login"] => Command::Login,
        ["callback", url] => Command::Callback(url.to_string()),
        ["status"] => Command::Status,
        ["me"] => Command::Me,
        ["now-playing"] => Command::NowPlaying,
        ["track", id] => Command::Track(id.to_string()),
        ["request", path] => {
            let method = match method.take() {
                Some(m) => Method::from_bytes(m.as_bytes())
                    .map_err(|_| anyhow::anyhow!("invalid HTTP method: {m}"))?,
                None => Method::GET,
            };
            Command::Request {
                method,
                path: path.to_string(),
            }
        }
        ["logout"] => Command::Logout,
        [] => bail!("missing command\n\n{USAGE}"),
        other => bail!("unrecognized command: {}\n\n{USAGE}", other.join(" ")),
    };

    if method.is_some() {
        bail!("--method only applies to `request`");
    }

    Ok(Invocation {
        config_path,
        command,
    })
}
