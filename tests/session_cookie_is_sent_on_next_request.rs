mod common;

use common::{Server, XML};
use fmxml::{ClientError, Connector, RequestIntent};

#[test]
fn test_session_cookie_is_sent_on_next_request() -> Result<(), ClientError> {
    common::init_tracing();
    let server = Server::start(vec![
        common::response(
            "200 OK",
            &["Content-Type: text/xml", "Set-Cookie: WPCSessionID=\"abc123\"; path=/"],
            XML.as_bytes(),
        ),
        common::response("200 OK", &["Content-Type: text/xml"], XML.as_bytes()),
    ]);
    let config = common::config(server.url()).with_cookie_session(true);
    let mut connector = Connector::connect(config);

    connector.execute(RequestIntent::new().flag("-dbnames"))?;
    connector.execute(RequestIntent::new().flag("-dbnames"))?;

    assert_eq!(Some("abc123".to_owned()), connector.session().token());
    let requests = server.requests();
    assert!(!requests[0].to_lowercase().contains("cookie:"));
    assert!(requests[1].to_lowercase().contains("cookie: wpcsessionid=abc123"));

    Ok(())
}

#[test]
fn test_session_cookie_is_not_read_from_body() -> Result<(), ClientError> {
    common::init_tracing();
    let body = "<?xml version=\"1.0\"?><!-- WPCSessionID=\"a\r\nb\"; --><fmresultset/>";
    let server = Server::start(vec![
        common::response(
            "200 OK",
            &["Content-Type: text/xml", "Set-Cookie: WPCSessionID=\"abc123\"; path=/"],
            body.as_bytes(),
        ),
        common::response("200 OK", &["Content-Type: text/xml"], XML.as_bytes()),
    ]);
    let config = common::config(server.url()).with_cookie_session(true);
    let mut connector = Connector::connect(config);

    connector.execute(RequestIntent::new().flag("-dbnames"))?;
    connector.execute(RequestIntent::new().flag("-dbnames"))?;

    assert_eq!(Some("abc123".to_owned()), connector.session().token());
    let requests = server.requests();
    assert!(requests[1].to_lowercase().contains("cookie: wpcsessionid=abc123\r\n"));

    Ok(())
}
