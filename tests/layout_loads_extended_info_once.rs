mod common;

use common::{Facade, Server};
use fmxml::{CacheState, ClientError, Field, Layout, LayoutInfo, ValueListItem};

const LAYOUT_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><FMPXMLLAYOUT/>";

fn info() -> LayoutInfo {
    let mut info = LayoutInfo::default();
    info.value_lists.insert(
        "Status".to_owned(),
        vec![ValueListItem::new("Open", "o"), ValueListItem::new("Closed", "c")],
    );
    info
}

#[test]
fn test_layout_loads_extended_info_once() -> Result<(), ClientError> {
    common::init_tracing();
    let server = Server::start(vec![
        common::response("200 OK", &["Content-Type: text/xml"], LAYOUT_XML.as_bytes()),
        common::response("200 OK", &["Content-Type: text/xml"], LAYOUT_XML.as_bytes()),
    ]);
    let mut facade = Facade::new(common::config(server.url()), info());
    let mut layout = Layout::new("Tickets", "Helpdesk").with_field(Field::new("Status"));

    assert_eq!(vec!["Status"], layout.list_value_lists(&mut facade)?);
    assert_eq!(Some(&["o".to_owned(), "c".to_owned()][..]), layout.value_list(&mut facade, "Status", None)?);
    assert!(facade.layouts.contains_key("Tickets"));

    layout.value_list_two_fields(&mut facade, "Status", Some("12"))?;
    assert_eq!(CacheState::BaseLoaded, layout.cache_state());

    let requests = server.requests();
    assert_eq!(2, requests.len());
    assert!(requests[0].starts_with("POST /fmi/xml/FMPXMLLAYOUT.xml"));
    assert!(requests[0].ends_with("-db=Helpdesk&-lay=Tickets&-view="));
    assert!(requests[1].ends_with("-db=Helpdesk&-lay=Tickets&-recid=12&-view="));

    Ok(())
}
