//! In-memory ESCO API served through wiremock

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};

use esco_common::Version;
use esco_ingest::esco::RetryingFetcher;
use esco_ingest::{
    EscoConfig, Extraction, ExtractionSession, ExtractionSummary, OutputRecord, RetryConfig,
};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ROOT: &str = "http://data.europa.eu/esco/skill/S";
pub const VERSION_PATH: &str = "/en/classification/skill_main";

/// `http://data.europa.eu/esco/skill/{code}`
pub fn concept_uri(code: &str) -> String {
    format!("http://data.europa.eu/esco/skill/{}", code)
}

pub fn skill_uri(name: &str) -> String {
    format!("http://data.europa.eu/esco/skill/{}", name)
}

pub fn version_page(versions: &[&str]) -> String {
    let items: String = versions
        .iter()
        .map(|v| format!("<li>ESCO dataset - {}</li>", v))
        .collect();
    format!(
        r#"<html><body><div class="block-wrapper--esco_version"><ul>{}</ul></div></body></html>"#,
        items
    )
}

#[derive(Debug, Clone, Default)]
struct Concept {
    title: String,
    concepts: Vec<String>,
    skills: Vec<String>,
}

/// Taxonomy served by the fake API plus its failure knobs
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    concepts: HashMap<String, Concept>,
    skills: HashMap<String, String>,
    parents: HashMap<String, String>,
    /// Status returned for every bulk request
    pub bulk_status: Option<u16>,
    /// Skills left out of bulk responses
    pub missing_from_bulk: HashSet<String>,
    /// Skills answering 404 on single fetch
    pub missing: HashSet<String>,
    /// Concepts answering with this status
    pub failing_concepts: HashMap<String, u16>,
    /// Include `_embedded.ancestors` in skill details
    pub embed_ancestors: bool,
}

impl Taxonomy {
    pub fn new(root_title: &str) -> Self {
        let mut taxonomy = Self::default();
        taxonomy.concepts.insert(
            ROOT.to_string(),
            Concept {
                title: root_title.to_string(),
                ..Concept::default()
            },
        );
        taxonomy
    }

    /// Add concept `uri` under `parent`
    pub fn concept(&mut self, parent: &str, uri: &str, title: &str) -> &mut Self {
        self.concepts
            .get_mut(parent)
            .expect("parent concept registered first")
            .concepts
            .push(uri.to_string());
        self.concepts.insert(
            uri.to_string(),
            Concept {
                title: title.to_string(),
                ..Concept::default()
            },
        );
        self.parents.insert(uri.to_string(), parent.to_string());
        self
    }

    /// Add skill leaves under concept `parent`
    pub fn skills(&mut self, parent: &str, names: &[&str]) -> &mut Self {
        for name in names {
            let uri = skill_uri(name);
            self.concepts
                .get_mut(parent)
                .expect("parent concept registered first")
                .skills
                .push(uri.clone());
            self.skills.insert(uri.clone(), name.to_string());
            self.parents.insert(uri, parent.to_string());
        }
        self
    }

    pub fn skill_uris(&self) -> HashSet<String> {
        self.skills.keys().cloned().collect()
    }

    fn link(&self, uri: &str) -> Value {
        let title = self
            .concepts
            .get(uri)
            .map(|c| c.title.clone())
            .or_else(|| self.skills.get(uri).cloned())
            .unwrap_or_default();
        json!({ "uri": uri, "title": title })
    }

    fn concept_json(&self, uri: &str, concept: &Concept) -> Value {
        let mut links = Map::new();
        links.insert(
            "self".to_string(),
            json!({ "href": format!("/resource/concept?uri={}", uri), "uri": uri }),
        );
        if !concept.concepts.is_empty() {
            let children: Vec<Value> = concept.concepts.iter().map(|c| self.link(c)).collect();
            links.insert("narrowerConcept".to_string(), Value::Array(children));
        }
        if !concept.skills.is_empty() {
            let children: Vec<Value> = concept.skills.iter().map(|s| self.link(s)).collect();
            links.insert("narrowerSkill".to_string(), Value::Array(children));
        }

        json!({ "uri": uri, "title": concept.title, "_links": links })
    }

    fn skill_json(&self, uri: &str) -> Option<Value> {
        let name = self.skills.get(uri)?;

        let mut detail = json!({
            "uri": uri,
            "title": name,
            "description": {
                "en-us": { "literal": format!("Description of {}", name), "mimetype": "plain/text" },
                "fr": { "literal": format!("Description de {}", name) }
            },
            "alternativeLabel": {
                "en": [format!("{} alt", name), format!("{} other", name)]
            }
        });

        if self.embed_ancestors {
            let mut ancestors = vec![self.ancestor_json(uri)];
            let mut current = uri.to_string();
            while let Some(parent) = self.parents.get(&current) {
                ancestors.push(self.ancestor_json(parent));
                current = parent.clone();
            }
            detail["_embedded"] = json!({ "ancestors": ancestors });
        }

        Some(detail)
    }

    fn ancestor_json(&self, uri: &str) -> Value {
        let title = self.link(uri)["title"].clone();
        json!({ "title": title, "_links": { "self": { "uri": uri, "title": title } } })
    }
}

impl Respond for Taxonomy {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params: HashMap<String, String> = request.url.query_pairs().into_owned().collect();

        if let Some(uris) = params.get("uris") {
            if let Some(status) = self.bulk_status {
                return ResponseTemplate::new(status);
            }

            let embedded: Map<String, Value> = uris
                .split(',')
                .filter(|uri| !self.missing_from_bulk.contains(*uri) && !self.missing.contains(*uri))
                .filter_map(|uri| self.skill_json(uri).map(|detail| (uri.to_string(), detail)))
                .collect();

            return ResponseTemplate::new(200).set_body_json(json!({ "_embedded": embedded }));
        }

        if let Some(uri) = params.get("uri") {
            if let Some(status) = self.failing_concepts.get(uri) {
                return ResponseTemplate::new(*status);
            }
            if let Some(concept) = self.concepts.get(uri) {
                return ResponseTemplate::new(200).set_body_json(self.concept_json(uri, concept));
            }
            if !self.missing.contains(uri) {
                if let Some(detail) = self.skill_json(uri) {
                    return ResponseTemplate::new(200).set_body_json(detail);
                }
            }
        }

        ResponseTemplate::new(404)
    }
}

/// Running fake API and a config pointing at it
pub struct FakeEsco {
    pub server: MockServer,
    pub config: EscoConfig,
}

impl FakeEsco {
    pub async fn start(taxonomy: Taxonomy, published: &[&str]) -> Self {
        Self::start_with_page(taxonomy, version_page(published)).await
    }

    pub async fn start_with_page(taxonomy: Taxonomy, page: String) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(VERSION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/resource/concept"))
            .respond_with(taxonomy.clone())
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/resource/skill"))
            .respond_with(taxonomy)
            .mount(&server)
            .await;

        let config = EscoConfig::builder()
            .api_base_url(server.uri())
            .version_page_url(format!("{}{}", server.uri(), VERSION_PATH))
            .root_uri(ROOT)
            .detail_path("resource/skill")
            .retry(RetryConfig::fast())
            .build()
            .unwrap();

        Self { server, config }
    }

    pub fn session(&self, last_synced: Option<Version>) -> ExtractionSession {
        self.session_with(self.config.clone(), last_synced)
    }

    pub fn session_with(&self, config: EscoConfig, last_synced: Option<Version>) -> ExtractionSession {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let fetcher = RetryingFetcher::with_client(client, config.retry.clone());
        ExtractionSession::with_fetcher(config, fetcher, last_synced)
    }

    /// Sizes of every bulk request, in order
    pub async fn bulk_sizes(&self) -> Vec<usize> {
        self.requests_with("uris")
            .await
            .iter()
            .map(|uris| uris.split(',').count())
            .collect()
    }

    /// `uri` parameters of single skill requests
    pub async fn single_requests(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == "/resource/skill")
            .filter_map(|r| query(&r, "uri"))
            .collect()
    }

    pub async fn concept_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/resource/concept" && query(r, "uri").is_some())
            .count()
    }

    async fn requests_with(&self, key: &str) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter_map(|r| query(r, key))
            .collect()
    }
}

fn query(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Drain the extraction and finish the session
pub async fn drain(
    session: &mut ExtractionSession,
    mut extraction: Extraction,
) -> (Vec<OutputRecord>, ExtractionSummary) {
    let mut records = Vec::new();
    while let Some(record) = extraction.next_record().await {
        records.push(record);
    }
    let summary = session.finish(extraction).await.unwrap();
    (records, summary)
}

/// API stub answering the first request with `body` and dropping every later connection
///
/// Returns the base URL to use as `api_base_url`.
pub async fn serve_once_then_drop(body: Value) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    tokio::spawn(async move {
        let mut served = false;
        while let Ok((mut socket, _)) = listener.accept().await {
            if served {
                drop(socket);
                continue;
            }
            served = true;

            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}", addr)
}
