// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Data;
use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, ResponseBox, StatusCode};

pub(crate) fn handle_request(data: &Data, req: &Request) -> ResponseBox {
    let url = req.url().split('?').next().unwrap_or("");
    let url_parts = url
        .split('/')
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();
    let prefix = ["api", "v1", "repos", data.owner.as_str(), data.repo.as_str()];

    let resp = if url_parts.len() >= prefix.len() && url_parts[..prefix.len()] == prefix {
        match (req.method(), &url_parts[prefix.len()..]) {
            (Method::Get, ["content", revision, rest @ ..]) => {
                handle_content(data, req, revision, &rest.join("/"))
            }
            (Method::Get, ["raw", revision, rest @ ..]) => {
                handle_raw(data, req, revision, &rest.join("/"))
            }
            (Method::Get, ["branches", branch]) => handle_branch(data, req, branch),
            (Method::Get, ["commits", sha]) => handle_commit(data, req, sha),
            _ => Ok(Resp::NotFound),
        }
    } else if url_parts == ["api", "v1", "user"] {
        handle_user(data, req)
    } else {
        Ok(Resp::NotFound)
    };

    match resp {
        Ok(resp) => resp.into_tiny_http(),
        Err(resp) => resp.into_tiny_http(),
    }
}

fn handle_content(data: &Data, req: &Request, revision: &str, relpath: &str) -> Result<Resp, Resp> {
    authorize_for_content(data, req)?;
    if revision != data.revision {
        return Ok(Resp::NotFound);
    }
    match data.listings.get(relpath) {
        Some(entries) => Ok(Resp::json(
            &entries
                .iter()
                .map(|e| JsonEntry {
                    path: e.path.clone(),
                    r#type: e.kind,
                    size: e.size,
                })
                .collect::<Vec<_>>(),
        )),
        None => Ok(Resp::NotFound),
    }
}

fn handle_raw(data: &Data, req: &Request, revision: &str, relpath: &str) -> Result<Resp, Resp> {
    authorize_for_content(data, req)?;
    if revision != data.revision {
        return Ok(Resp::NotFound);
    }
    match data.files.get(relpath) {
        Some(bytes) => Ok(Resp::Bytes(bytes.clone())),
        None => Ok(Resp::NotFound),
    }
}

fn handle_branch(data: &Data, req: &Request, branch: &str) -> Result<Resp, Resp> {
    authorize(data, req)?;
    match data.branches.get(branch) {
        Some(commit) => Ok(Resp::json(&BranchResponse {
            commit: CommitRef {
                id: commit.clone(),
            },
        })),
        None => Ok(Resp::NotFound),
    }
}

fn handle_commit(data: &Data, req: &Request, sha: &str) -> Result<Resp, Resp> {
    authorize(data, req)?;
    if data.revision == sha || data.branches.values().any(|c| c == sha) {
        Ok(Resp::Empty(StatusCode(200)))
    } else {
        Ok(Resp::NotFound)
    }
}

fn handle_user(data: &Data, req: &Request) -> Result<Resp, Resp> {
    let login = authorize(data, req)?;
    Ok(Resp::json(&UserResponse {
        login: login.clone(),
    }))
}

fn authorize<'a>(data: &'a Data, req: &Request) -> Result<&'a String, Resp> {
    let token = bearer_token(req)?;
    data.tokens.get(token).ok_or(Resp::Unauthorized)
}

/// Like [`authorize`], but additionally rejects a token placed in `revoked_for_content` —
/// used to simulate a token that still passes identity checks but has been revoked for
/// actual content access, so the 401 originates from the remote operation itself.
fn authorize_for_content(data: &Data, req: &Request) -> Result<(), Resp> {
    let token = bearer_token(req)?;
    if !data.tokens.contains_key(token) {
        return Err(Resp::Unauthorized);
    }
    if data.revoked_for_content.contains(token) {
        return Err(Resp::Unauthorized);
    }
    Ok(())
}

fn bearer_token(req: &Request) -> Result<&str, Resp> {
    let header = req
        .headers()
        .iter()
        .find(|h| h.field.equiv("authorization"))
        .ok_or(Resp::Unauthorized)?;

    header
        .value
        .as_str()
        .strip_prefix("Bearer ")
        .ok_or(Resp::Unauthorized)
}

#[derive(Debug)]
enum Resp {
    Unauthorized,
    NotFound,
    Empty(StatusCode),
    Bytes(Vec<u8>),
    Json(Vec<u8>),
}

impl Resp {
    fn json<T: Serialize>(data: &T) -> Resp {
        Resp::Json(serde_json::to_vec(data).unwrap())
    }

    fn into_tiny_http(self) -> ResponseBox {
        match self {
            Resp::Json(data) => Response::from_data(data)
                .with_status_code(StatusCode(200))
                .with_header(
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                )
                .boxed(),
            Resp::Bytes(data) => Response::from_data(data)
                .with_status_code(StatusCode(200))
                .boxed(),
            Resp::Empty(code) => Response::empty(code).boxed(),
            Resp::Unauthorized => Response::empty(StatusCode(401)).boxed(),
            Resp::NotFound => Response::empty(StatusCode(404)).boxed(),
        }
    }
}

#[derive(Serialize)]
struct JsonEntry {
    path: String,
    r#type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

#[derive(Serialize)]
struct BranchResponse {
    commit: CommitRef,
}

#[derive(Serialize)]
struct CommitRef {
    id: String,
}

#[derive(Serialize)]
struct UserResponse {
    login: String,
}
