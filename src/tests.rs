use super::*;

use std::error::Error as StdError;
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

type TestResult<T> = std::result::Result<T, Box<dyn StdError>>;

// minimal namespace-resolved tree, good enough to inspect writer output
#[derive(Debug, Default)]
struct Node {
	ns: Option<String>,
	name: String,
	attrs: Vec<(Option<String>, String, String)>,
	text: String,
	children: Vec<Node>,
}

impl Node {
	fn child(&self, ns: Option<&str>, name: &str) -> &Node {
		self.children
			.iter()
			.find(|c| c.ns.as_deref() == ns && c.name == name)
			.unwrap_or_else(|| panic!("no child {:?} {:?} in {:?}", ns, name, self.name))
	}

	fn count(&self, ns: Option<&str>, name: &str) -> usize {
		self.children
			.iter()
			.filter(|c| c.ns.as_deref() == ns && c.name == name)
			.count()
	}

	fn attr(&self, ns: Option<&str>, name: &str) -> Option<&str> {
		self.attrs
			.iter()
			.find(|(ans, aname, _)| ans.as_deref() == ns && aname == name)
			.map(|(_, _, value)| value.as_str())
	}
}

fn utf8(b: &[u8]) -> String {
	str::from_utf8(b).unwrap().to_string()
}

fn namespace(r: ResolveResult) -> Option<String> {
	match r {
		ResolveResult::Bound(Namespace(uri)) => Some(utf8(uri)),
		ResolveResult::Unbound => None,
		ResolveResult::Unknown(prefix) => panic!("undeclared prefix {:?}", utf8(&prefix)),
	}
}

fn element(reader: &NsReader<&[u8]>, e: &BytesStart) -> Node {
	let (ns, local) = reader.resolve_element(e.name());
	let mut node = Node {
		ns: namespace(ns),
		name: utf8(local.as_ref()),
		..Node::default()
	};
	for attr in e.attributes() {
		let attr = attr.unwrap();
		if attr.key.as_namespace_binding().is_some() {
			continue;
		}
		let (ns, local) = reader.resolve_attribute(attr.key);
		node.attrs
			.push((namespace(ns), utf8(local.as_ref()), utf8(&attr.value)));
	}
	node
}

/// Parse `doc` and return the document node; its only child element is the
/// root element.
fn parse(doc: &str) -> Node {
	let mut reader = NsReader::from_str(doc);
	let mut stack = vec![Node::default()];
	loop {
		match reader.read_event().unwrap() {
			Event::Start(e) => {
				let node = element(&reader, &e);
				stack.push(node);
			}
			Event::Empty(e) => {
				let node = element(&reader, &e);
				stack.last_mut().unwrap().children.push(node);
			}
			Event::End(_) => {
				let node = stack.pop().unwrap();
				stack.last_mut().unwrap().children.push(node);
			}
			Event::Text(e) => {
				stack.last_mut().unwrap().text.push_str(str::from_utf8(&e).unwrap());
			}
			Event::Eof => break,
			_ => (),
		}
	}
	assert_eq!(stack.len(), 1, "unbalanced document: {}", doc);
	stack.pop().unwrap()
}

fn into_string(w: ElementWriter<Encoder<Vec<u8>>>) -> String {
	String::from_utf8(w.into_sink().into_inner().unwrap()).unwrap()
}

fn inventory() -> TestResult<String> {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.set_default_namespace("http://x/quux")
		.map_namespace("foo", "http://x/foo")
		.map_namespace("bar", "http://x/bar");
	w.start_doc()?
		.start_root_element("inventory")?
		.set_current_namespace(Some("foo"))?
		.start_element("site")?
		.prefixed_attribute("foo", "isWarehouse", "yes")?
		.characters("Oklahoma City facility")?
		.end_element_named("site")?
		.set_current_namespace(Some("bar"))?
		.start_element("capacity")?
		.prefixed_attribute("foo", "units", "sq.ft.")?
		.characters("200,000")?
		.end_element_named("capacity")?
		.set_current_namespace(None)?
		.start_element("items")?;
	for (sku, description, quantity) in &[
		("a-1021", "Widget, large", "12"),
		("b-0042", "Gadget", "3"),
	] {
		w.start_element("item")?
			.set_current_namespace(Some("foo"))?
			.start_element("sku")?
			.characters(sku)?
			.end_element()?
			.start_element("description")?
			.characters(description)?
			.end_element()?
			.start_element("quantity")?
			.characters(quantity)?
			.end_element()?
			.set_current_namespace(None)?
			.end_element_named("item")?;
	}
	w.end_element_named("items")?
		.end_element_named("inventory")?
		.end_doc()?;
	Ok(String::from_utf8(w.into_sink().into_inner()?)?)
}

#[test]
fn inventory_round_trip() {
	let out = inventory().unwrap();
	let doc = parse(&out);
	let inventory = doc.child(Some("http://x/quux"), "inventory");

	let site = inventory.child(Some("http://x/foo"), "site");
	assert_eq!(site.attr(Some("http://x/foo"), "isWarehouse"), Some("yes"));
	assert_eq!(site.text, "Oklahoma City facility");

	let capacity = inventory.child(Some("http://x/bar"), "capacity");
	assert_eq!(capacity.text, "200,000");
	assert_eq!(capacity.attr(Some("http://x/foo"), "units"), Some("sq.ft."));

	let items = inventory.child(Some("http://x/quux"), "items");
	assert_eq!(items.count(Some("http://x/quux"), "item"), 2);
	for item in &items.children {
		assert_eq!(item.count(Some("http://x/foo"), "sku"), 1);
		assert_eq!(item.count(Some("http://x/foo"), "description"), 1);
		assert_eq!(item.count(Some("http://x/foo"), "quantity"), 1);
	}
}

#[test]
fn inventory_declares_namespaces_once() {
	let out = inventory().unwrap();
	assert_eq!(out.matches("xmlns=").count(), 1);
	assert_eq!(out.matches("xmlns:foo=").count(), 1);
	assert_eq!(out.matches("xmlns:bar=").count(), 1);
	assert!(out.starts_with(
		"<?xml version=\"1.0\"?>\n<inventory xmlns=\"http://x/quux\" \
		 xmlns:bar=\"http://x/bar\" xmlns:foo=\"http://x/foo\">"
	));
}

#[test]
fn unclosed_elements_are_closed_at_end_of_document() {
	let mut w = ElementWriter::from_writer_with_options(
		Vec::new(),
		EncoderOptions::default().declaration_newline(false),
	);
	w.start_doc()
		.unwrap()
		.start_element("foo")
		.unwrap()
		.start_element("bar")
		.unwrap()
		.end_doc()
		.unwrap();
	assert_eq!(
		into_string(w),
		"<?xml version=\"1.0\"?><foo><bar></bar></foo>"
	);
}

#[test]
fn balanced_elements_nest_properly() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.start_doc().unwrap().start_root_element("a").unwrap();
	for _ in 0..3 {
		w.start_element("b").unwrap().empty_element("c").unwrap();
	}
	for _ in 0..3 {
		w.end_element().unwrap();
	}
	w.end_element().unwrap().end_doc().unwrap();
	let doc = parse(&into_string(w));
	let mut node = doc.child(None, "a");
	for _ in 0..3 {
		node = node.child(None, "b");
		assert_eq!(node.count(None, "c"), 1);
	}
}

#[test]
fn cursor_then_none_reverts_to_unqualified() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.map_namespace("foo", "http://x/foo");
	w.start_doc()
		.unwrap()
		.start_root_element("root")
		.unwrap()
		.set_current_namespace(Some("foo"))
		.unwrap()
		.empty_element("qualified")
		.unwrap()
		.set_current_namespace(None)
		.unwrap()
		.empty_element("plain")
		.unwrap()
		.end_doc()
		.unwrap();
	let out = into_string(w);
	assert!(out.contains("<foo:qualified/><plain/>"));
	let root = parse(&out);
	let root = root.child(None, "root");
	assert_eq!(root.count(Some("http://x/foo"), "qualified"), 1);
	assert_eq!(root.count(None, "plain"), 1);
}

#[test]
fn override_leaves_cursor_in_place() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.map_namespaces(vec![("foo", "http://x/foo"), ("bar", "http://x/bar")]);
	w.start_doc()
		.unwrap()
		.start_root_element("root")
		.unwrap()
		.set_current_namespace(Some("foo"))
		.unwrap()
		.empty_element_in("once", Some("bar"))
		.unwrap()
		.empty_element_in("bare", None)
		.unwrap()
		.empty_element("after")
		.unwrap()
		.end_doc()
		.unwrap();
	let doc = parse(&into_string(w));
	let root = doc.child(None, "root");
	assert_eq!(root.count(Some("http://x/bar"), "once"), 1);
	assert_eq!(root.count(None, "bare"), 1);
	assert_eq!(root.count(Some("http://x/foo"), "after"), 1);
}

#[test]
fn unknown_cursor_prefix_is_rejected_without_output() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.start_doc().unwrap().start_root_element("root").unwrap();
	let before = w.sink().buffered();
	match w.set_current_namespace(Some("x")) {
		Err(Error::UnknownNamespace(p)) => assert_eq!(p, "x"),
		other => panic!("unexpected result: {:?}", other.map(|_| ())),
	}
	assert_eq!(w.current_namespace(), None);
	assert_eq!(w.sink().buffered(), before);
}

#[test]
fn prefixed_attribute_is_independent_of_element_namespace() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.map_namespace("foo", "http://x/foo")
		.map_namespace("bar", "http://x/bar");
	w.start_doc()
		.unwrap()
		.start_root_element("root")
		.unwrap()
		.empty_element_in("e", Some("bar"))
		.unwrap()
		.prefixed_attribute("foo", "units", "sq.ft.")
		.unwrap()
		.attribute("plain", "x")
		.unwrap()
		.end_doc()
		.unwrap();
	let doc = parse(&into_string(w));
	let e = doc.child(None, "root").child(Some("http://x/bar"), "e");
	assert_eq!(e.attr(Some("http://x/foo"), "units"), Some("sq.ft."));
	assert_eq!(e.attr(Some("http://x/bar"), "units"), None);
	assert_eq!(e.attr(None, "plain"), Some("x"));
}

#[test]
fn bindings_added_after_start_doc_are_declared_on_root() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.start_doc().unwrap();
	w.map_namespace("late", "http://x/late");
	w.start_root_element("root")
		.unwrap()
		.empty_element_in("e", Some("late"))
		.unwrap()
		.end_doc()
		.unwrap();
	let doc = parse(&into_string(w));
	assert_eq!(doc.child(None, "root").count(Some("http://x/late"), "e"), 1);
}

#[test]
fn write_before_start_doc_is_a_lifecycle_violation() {
	let mut w = ElementWriter::from_writer(Vec::new());
	match w.end_element() {
		Err(Error::Lifecycle { operation, state }) => {
			assert_eq!(operation, "end_element");
			assert_eq!(state, DocumentState::NotStarted);
		}
		other => panic!("unexpected result: {:?}", other.map(|_| ())),
	}
	assert_eq!(into_string(w), "");
}

#[test]
fn encoder_errors_are_wrapped_with_context() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.start_doc().unwrap();
	let err = match w.characters("stray") {
		Err(e) => e,
		Ok(_) => panic!("text outside of the root element must fail"),
	};
	let failure = err.as_write_failure().unwrap();
	assert_eq!(failure.operation(), "characters");
	assert_eq!(failure.primitive(), "text");
	match failure.sink_error().downcast_ref::<EncodeError>() {
		Some(EncodeError::TextNotAllowed) => (),
		other => panic!("unexpected sink error: {:?}", other),
	}
}

#[test]
fn declaration_carries_version_and_encoding() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.start_doc_with("1.1", Some("UTF-8"))
		.unwrap()
		.start_root_element("r")
		.unwrap()
		.end_doc()
		.unwrap();
	assert_eq!(
		into_string(w),
		"<?xml version=\"1.1\" encoding=\"UTF-8\"?>\n<r></r>"
	);
}

#[test]
fn doctype_comments_and_instructions() {
	let mut w = ElementWriter::from_writer_with_options(
		Vec::new(),
		EncoderOptions::default().declaration_newline(false),
	);
	w.start_doc()
		.unwrap()
		.raw_declaration("<!DOCTYPE inventory>")
		.unwrap()
		.processing_instruction_with("xml-stylesheet", "type=\"text/xsl\" href=\"inv.xsl\"")
		.unwrap()
		.start_root_element("inventory")
		.unwrap()
		.comment(" stock ")
		.unwrap()
		.cdata("<raw>")
		.unwrap()
		.entity_ref("amp")
		.unwrap()
		.end_element()
		.unwrap()
		.processing_instruction("done")
		.unwrap()
		.end_doc()
		.unwrap();
	assert_eq!(
		into_string(w),
		"<?xml version=\"1.0\"?><!DOCTYPE inventory>\
		 <?xml-stylesheet type=\"text/xsl\" href=\"inv.xsl\"?>\
		 <inventory><!-- stock --><![CDATA[<raw>]]>&amp;</inventory><?done?>"
	);
}

#[test]
fn characters_from_selects_a_slice() {
	let buf: Vec<char> = "[Oklahoma City]".chars().collect();
	let mut w = ElementWriter::from_writer(Vec::new());
	w.start_doc()
		.unwrap()
		.start_root_element("site")
		.unwrap()
		.characters_from(&buf, 1, 13)
		.unwrap()
		.end_doc()
		.unwrap();
	let doc = parse(&into_string(w));
	assert_eq!(doc.child(None, "site").text, "Oklahoma City");
}

#[test]
fn with_namespaces_uses_the_given_registry() {
	let ns: NamespaceRegistry = vec![("foo", "http://x/foo")].into_iter().collect();
	let mut w = ElementWriter::with_namespaces(Encoder::new(Vec::new()), ns);
	assert!(w.namespaces().contains("foo"));
	w.start_doc()
		.unwrap()
		.set_current_namespace(Some("foo"))
		.unwrap()
		.start_root_element("root")
		.unwrap()
		.end_doc()
		.unwrap();
	let doc = parse(&into_string(w));
	assert_eq!(doc.count(Some("http://x/foo"), "root"), 1);
}

#[test]
fn prefixes_sharing_a_uri_qualify_with_the_selected_prefix() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.map_namespace("foo", "http://x/same")
		.map_namespace("bar", "http://x/same");
	w.start_doc()
		.unwrap()
		.start_root_element("root")
		.unwrap()
		.set_current_namespace(Some("bar"))
		.unwrap()
		.empty_element("e")
		.unwrap()
		.empty_element_in("f", Some("foo"))
		.unwrap()
		.end_doc()
		.unwrap();
	let out = into_string(w);
	assert!(out.contains("<bar:e/><foo:f/>"), "{}", out);
	let doc = parse(&out);
	let root = doc.child(None, "root");
	assert_eq!(root.count(Some("http://x/same"), "e"), 1);
	assert_eq!(root.count(Some("http://x/same"), "f"), 1);
}

#[test]
fn bindings_added_after_root_are_declared_where_used() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.start_doc()
		.unwrap()
		.start_root_element("root")
		.unwrap();
	w.map_namespace("late", "http://x/late")
		.map_namespace("attr", "http://x/attr");
	w.empty_element_in("e", Some("late"))
		.unwrap()
		.empty_element("plain")
		.unwrap()
		.prefixed_attribute("attr", "flag", "yes")
		.unwrap()
		.end_doc()
		.unwrap();
	let out = into_string(w);
	assert!(out.contains("<late:e xmlns:late=\"http://x/late\"/>"), "{}", out);
	let doc = parse(&out);
	let root = doc.child(None, "root");
	assert_eq!(root.count(Some("http://x/late"), "e"), 1);
	assert_eq!(
		root.child(None, "plain").attr(Some("http://x/attr"), "flag"),
		Some("yes")
	);
}

#[test]
fn reserved_prefix_is_rejected_by_the_encoder() {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.map_namespace("xmlns", "http://x/evil");
	let err = match w.start_doc() {
		Err(e) => e,
		Ok(_) => panic!("binding the xmlns prefix must fail"),
	};
	let failure = err.as_write_failure().unwrap();
	assert_eq!(failure.operation(), "start_doc");
	assert_eq!(failure.primitive(), "bind_prefix");
	match failure.sink_error().downcast_ref::<EncodeError>() {
		Some(EncodeError::ReservedPrefix(p)) => assert_eq!(p, "xmlns"),
		other => panic!("unexpected sink error: {:?}", other),
	}
}
