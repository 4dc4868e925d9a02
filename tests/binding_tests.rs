//! Integration tests for JSON, XML, multipart, form and query binding inside
//! handlers.

use http::StatusCode;
use serde::Deserialize;
use sol::binding::{
    bind_form, bind_json, bind_multipart, bind_query, bind_xml, BindError, FormValues, FromForm,
    FromMultipart, MultipartForm,
};
use sol::dispatcher::Context;
use sol::{handlers, Router};

mod common;
use common::http::{body_str, request, request_with};

#[derive(Debug, Deserialize)]
struct Login {
    user: String,
    remember: bool,
}

#[derive(Debug)]
struct Search {
    q: String,
    page: u32,
}

impl FromForm for Search {
    fn from_form(form: &FormValues) -> Result<Self, BindError> {
        Ok(Search {
            q: form.required("q")?,
            page: form.optional("page")?.unwrap_or(1),
        })
    }
}

#[derive(Debug)]
struct Upload {
    title: String,
    album: u32,
    photos: Vec<(String, usize)>,
}

impl FromMultipart for Upload {
    fn from_multipart(form: &MultipartForm) -> Result<Self, BindError> {
        Ok(Upload {
            title: form.values().required("title")?,
            album: form.values().required("album")?,
            photos: form
                .files("photo")
                .map(|f| (f.file_name.clone(), f.data.len()))
                .collect(),
        })
    }
}

const UPLOAD_BODY: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
Holiday\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"photo\"; filename=\"beach.png\"\r\n\
Content-Type: image/png\r\n\r\n\
\x89PNG\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"photo\"; filename=\"dunes.png\"\r\n\
Content-Type: image/png\r\n\r\n\
\x89PNG12\r\n\
--XyZ--\r\n";

fn json_router() -> Router {
    let mut router = Router::new();
    router.post(
        "/login",
        handlers![|c: &mut Context| match bind_json::<Login>(c) {
            Ok(login) => {
                let body = format!("{}:{}", login.user, login.remember);
                c.string(StatusCode::OK, body);
            }
            Err(err) => {
                let body = err.to_string();
                c.string(StatusCode::BAD_REQUEST, body);
            }
        }],
    );
    router
}

#[test]
fn test_bind_json() {
    let router = json_router();
    let req = request_with(
        "POST",
        "/login",
        &[("content-type", "application/json; charset=utf-8")],
        br#"{"user":"ferris","remember":true}"#,
    );
    let resp = router.dispatch(req);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_str(&resp), "ferris:true");
}

#[test]
fn test_bind_json_rejects_bad_input() {
    let router = json_router();

    let req = request_with("POST", "/login", &[("content-type", "text/plain")], b"{}");
    let resp = router.dispatch(req);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_str(&resp).starts_with("content type must be application/json"));

    let req = request_with("POST", "/login", &[("content-type", "application/json")], b"");
    assert_eq!(body_str(&router.dispatch(req)), "empty request body");

    let req = request_with(
        "POST",
        "/login",
        &[("content-type", "application/json")],
        br#"{"user":"ferris"}"#,
    );
    assert!(body_str(&router.dispatch(req)).starts_with("json decode error:"));
}

#[test]
fn test_bind_form_body_before_query() {
    let mut router = Router::new();
    router.post(
        "/search",
        handlers![|c: &mut Context| {
            let body = match bind_form::<Search>(c) {
                Ok(s) => format!("{}#{}", s.q, s.page),
                Err(err) => err.to_string(),
            };
            c.string(StatusCode::OK, body);
        }],
    );

    let req = request_with(
        "POST",
        "/search?q=from+query&page=3",
        &[("content-type", "application/x-www-form-urlencoded")],
        b"q=from+body",
    );
    assert_eq!(body_str(&router.dispatch(req)), "from body#3");

    // a non-form body is ignored
    let req = request_with(
        "POST",
        "/search?q=only+query",
        &[("content-type", "application/json")],
        b"q=ignored",
    );
    assert_eq!(body_str(&router.dispatch(req)), "only query#1");

    let req = request_with(
        "POST",
        "/search?page=two",
        &[("content-type", "application/x-www-form-urlencoded")],
        b"q=x",
    );
    assert!(body_str(&router.dispatch(req)).starts_with("bind page=two: "));
}

#[test]
fn test_bind_query() {
    let mut router = Router::new();
    router.get(
        "/search",
        handlers![|c: &mut Context| {
            let body = match bind_query::<Search>(c) {
                Ok(s) => format!("{}#{}", s.q, s.page),
                Err(err) => err.to_string(),
            };
            c.string(StatusCode::OK, body);
        }],
    );

    assert_eq!(
        body_str(&router.dispatch(request("GET", "/search?q=r%C3%BCst&page=9"))),
        "rüst#9"
    );
    assert_eq!(
        body_str(&router.dispatch(request("GET", "/search"))),
        "missing field 'q'"
    );
}

fn xml_router() -> Router {
    let mut router = Router::new();
    router.post(
        "/login",
        handlers![|c: &mut Context| match bind_xml::<Login>(c) {
            Ok(login) => {
                let body = format!("{}:{}", login.user, login.remember);
                c.string(StatusCode::OK, body);
            }
            Err(err) => {
                let body = err.to_string();
                c.string(StatusCode::BAD_REQUEST, body);
            }
        }],
    );
    router
}

#[test]
fn test_bind_xml() {
    let router = xml_router();
    let doc = b"<login><user>ferris</user><remember>true</remember></login>";

    let req = request_with("POST", "/login", &[("content-type", "application/xml")], doc);
    let resp = router.dispatch(req);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_str(&resp), "ferris:true");

    let req = request_with(
        "POST",
        "/login",
        &[("content-type", "text/xml; charset=utf-8")],
        doc,
    );
    assert_eq!(body_str(&router.dispatch(req)), "ferris:true");
}

#[test]
fn test_bind_xml_rejects_bad_input() {
    let router = xml_router();

    let req = request_with(
        "POST",
        "/login",
        &[("content-type", "application/json")],
        b"<login/>",
    );
    let resp = router.dispatch(req);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_str(&resp).starts_with("content type must be application/xml"));

    let req = request_with("POST", "/login", &[("content-type", "application/xml")], b"");
    assert_eq!(body_str(&router.dispatch(req)), "empty request body");

    let req = request_with(
        "POST",
        "/login",
        &[("content-type", "application/xml")],
        b"<login><user>ferris</user></login>",
    );
    assert!(body_str(&router.dispatch(req)).starts_with("xml decode error:"));
}

fn upload_router() -> Router {
    let mut router = Router::new();
    router.post(
        "/albums/upload",
        handlers![|c: &mut Context| match bind_multipart::<Upload>(c) {
            Ok(up) => {
                let photos: Vec<String> = up
                    .photos
                    .iter()
                    .map(|(name, len)| format!("{name}={len}"))
                    .collect();
                let body = format!("{}@{} {}", up.title, up.album, photos.join(","));
                c.string(StatusCode::OK, body);
            }
            Err(err) => {
                let body = err.to_string();
                c.string(StatusCode::BAD_REQUEST, body);
            }
        }],
    );
    router
}

#[test]
fn test_bind_multipart_fields_and_files() {
    let router = upload_router();
    let req = request_with(
        "POST",
        "/albums/upload?album=7&title=ignored",
        &[("content-type", "multipart/form-data; boundary=XyZ")],
        UPLOAD_BODY,
    );
    let resp = router.dispatch(req);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_str(&resp), "Holiday@7 beach.png=4,dunes.png=6");
}

#[test]
fn test_bind_multipart_rejects_bad_input() {
    let router = upload_router();

    let req = request_with(
        "POST",
        "/albums/upload",
        &[("content-type", "application/x-www-form-urlencoded")],
        b"title=x",
    );
    assert!(body_str(&router.dispatch(req)).starts_with("content type must be multipart/form-data"));

    let req = request_with(
        "POST",
        "/albums/upload",
        &[("content-type", "multipart/form-data")],
        UPLOAD_BODY,
    );
    assert!(body_str(&router.dispatch(req)).starts_with("multipart error:"));

    let req = request_with(
        "POST",
        "/albums/upload",
        &[("content-type", "multipart/form-data; boundary=XyZ")],
        b"",
    );
    assert_eq!(body_str(&router.dispatch(req)), "empty request body");

    // body parses, but the album field is missing
    let req = request_with(
        "POST",
        "/albums/upload",
        &[("content-type", "multipart/form-data; boundary=XyZ")],
        UPLOAD_BODY,
    );
    assert_eq!(body_str(&router.dispatch(req)), "missing field 'album'");
}
