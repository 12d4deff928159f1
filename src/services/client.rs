//! Blocking JSON client shared by every Location Service feature
//!
//! Each call sends exactly one request and suspends the calling thread until the response (or
//! an error) arrives. Nothing is retried.
use crate::Error;
use log::{debug, trace};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

static JSON_CONTENT_TYPE: &str = "application/json";

/// Query parameters holding credentials, their values never get logged
static SECRET_PARAMETERS: &[&str] = &["key", "APIkey", "access_token"];

/// Sends raw HTTP requests, one request per call
pub trait HttpTransport {
    /// Perform a GET request and return the body of a successful response
    fn get(&self, url: &Url) -> Result<Vec<u8>, Error>;

    /// POST a JSON body and return the body of a successful response
    fn post_json(&self, url: &Url, body: Vec<u8>) -> Result<Vec<u8>, Error>;
}

/// Transport backed by a blocking reqwest client
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport, without a timeout the client's default applies
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(ReqwestTransport {
            client: builder.build()?,
        })
    }

    fn read_response(resp: reqwest::blocking::Response) -> Result<Vec<u8>, Error> {
        if resp.status().is_success() {
            Ok(resp.bytes()?.to_vec())
        } else {
            // the body usually carries the reason the request was rejected
            let code = resp.status();
            let message = resp.text().unwrap_or_default();
            Err(Error::RequestError(code, message))
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>, Error> {
        let resp = self.client.get(url.clone()).send()?;
        Self::read_response(resp)
    }

    fn post_json(&self, url: &Url, body: Vec<u8>) -> Result<Vec<u8>, Error> {
        let resp = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()?;
        Self::read_response(resp)
    }
}

/// Sends JSON requests and decodes the responses into typed records
pub struct ApiClient {
    transport: Box<dyn HttpTransport>,
}

impl ApiClient {
    pub fn new(transport: Box<dyn HttpTransport>) -> Self {
        ApiClient { transport }
    }

    /// Client using reqwest as the transport
    pub fn with_timeout(timeout_secs: Option<u64>) -> Result<Self, Error> {
        Ok(Self::new(Box::new(ReqwestTransport::new(timeout_secs)?)))
    }

    /// POST `payload` as JSON to `url` and decode the response body
    pub fn post_json<P, R>(&self, url: &str, payload: &P) -> Result<R, Error>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = parse_url(url)?;
        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::InvalidConfigurationValue(format!("invalid request: {}", e)))?;
        debug!("POST {}", redacted(&url));
        trace!("Request body: {}", String::from_utf8_lossy(&body));
        let response = self.transport.post_json(&url, body)?;
        decode(&response)
    }

    /// GET `url` and decode the response body
    pub fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R, Error> {
        let url = parse_url(url)?;
        debug!("GET {}", redacted(&url));
        let response = self.transport.get(&url)?;
        decode(&response)
    }
}

fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| Error::UrlParse(format!("{}: {}", e, redact_str(url))))
}

/// Decode in two steps so malformed JSON and an unexpected structure are told apart
fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R, Error> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(Error::Decode)?;
    trace!("Response body: {}", value);
    serde_json::from_value(value).map_err(|e| Error::SchemaViolation(e.to_string()))
}

/// URL text with credential values masked, used for logging
pub fn redacted(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if SECRET_PARAMETERS.contains(&k.as_ref()) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    let mut url = url.clone();
    if !pairs.is_empty() {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url.to_string()
}

fn redact_str(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => redacted(&parsed),
        Err(_) => url.split('?').next().unwrap_or_default().to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::mock::client;
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        value: i32,
    }

    #[test]
    fn post_sends_json_and_decodes_reply() {
        let (client, transport) = client();
        transport.respond(r#"{"value": 42}"#);
        let answer: Answer = client
            .post_json("https://example.com/api?key=abc", &json!({"Position": [1.0, 2.0]}))
            .unwrap();
        assert_eq!(answer, Answer { value: 42 });

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "https://example.com/api?key=abc");
        assert_eq!(requests[0].body, Some(json!({"Position": [1.0, 2.0]})));
    }

    #[test]
    fn non_json_body_is_a_decode_failure() {
        let (client, transport) = client();
        transport.respond("<html>Bad gateway</html>");
        let result: Result<serde_json::Value, Error> =
            client.post_json("https://example.com/api", &json!({}));
        match result {
            Err(Error::Decode(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_body_is_a_decode_failure() {
        let (client, transport) = client();
        transport.respond("");
        let result: Result<serde_json::Value, Error> = client.get_json("https://example.com/");
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn missing_field_is_a_schema_violation() {
        let (client, transport) = client();
        transport.respond(r#"{"other": 1}"#);
        let result: Result<Answer, Error> = client.get_json("https://example.com/");
        assert!(matches!(result, Err(Error::SchemaViolation(_))));
    }

    #[test]
    fn transport_errors_propagate() {
        let (client, transport) = client();
        transport.fail(Error::RequestError(
            reqwest::StatusCode::FORBIDDEN,
            "invalid key".to_string(),
        ));
        let result: Result<Answer, Error> = client.post_json("https://example.com/", &json!({}));
        match result {
            Err(e) => assert!(e.is_transport_failure()),
            Ok(_) => panic!("expected an error"),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn invalid_url_never_reaches_transport() {
        let (client, transport) = client();
        let result: Result<Answer, Error> = client.get_json("not a url?key=secret");
        match result {
            Err(Error::UrlParse(msg)) => assert!(!msg.contains("secret")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(transport.requests().is_empty());
    }

    /// Serve one raw HTTP response on a local port and return the URL to request
    fn serve_once(status: &'static str, body: &'static str) -> (Url, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
        });
        let url = Url::parse(&format!("http://127.0.0.1:{}/tiles?key=abc", port)).unwrap();
        (url, handle)
    }

    #[test]
    fn success_body_is_returned_unchanged() {
        let (url, server) = serve_once("200 OK", r#"{"value": 7}"#);
        let body = ReqwestTransport::new(Some(5)).unwrap().get(&url).unwrap();
        server.join().unwrap();
        assert_eq!(body, br#"{"value": 7}"#.to_vec());
    }

    #[test]
    fn error_status_keeps_code_and_body() {
        let (url, server) = serve_once("403 Forbidden", "Invalid API key");
        let result = ReqwestTransport::new(Some(5)).unwrap().get(&url);
        server.join().unwrap();
        match result {
            Err(Error::RequestError(code, msg)) => {
                assert_eq!(code, reqwest::StatusCode::FORBIDDEN);
                assert_eq!(msg, "Invalid API key");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn network_errors_do_not_reveal_the_key() {
        // grab a free port and close it again so the connection is refused
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = ApiClient::with_timeout(Some(2)).unwrap();
        let url = format!("http://127.0.0.1:{}/route?key=SUPERSECRET", port);
        let err = client
            .post_json::<_, serde_json::Value>(&url, &json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(!format!("{}", err).contains("SUPERSECRET"));
        assert!(!format!("{:?}", err).contains("SUPERSECRET"));
    }

    #[test]
    fn redaction_masks_credentials() {
        let url = Url::parse("https://maps.example.com/tiles?key=abc123&lang=en").unwrap();
        let text = redacted(&url);
        assert!(!text.contains("abc123"));
        assert!(text.contains("lang=en"));
    }
}
