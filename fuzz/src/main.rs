#[macro_use]
extern crate afl;
extern crate nswriter;

use nswriter::ElementWriter;

// Each chunk of the input (split at NUL) drives one writer call. The first
// byte of a chunk selects the operation, the rest is used as name or text.
// Errors are fine; panics and malformed output are not.
fn drive(chunks: &[&str]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
	let mut w = ElementWriter::from_writer(Vec::new());
	w.map_namespace("a", "urn:fuzz:a")
		.map_namespace("b", "urn:fuzz:b")
		.set_default_namespace("urn:fuzz");
	w.start_doc()?.start_root_element("root")?;
	for chunk in chunks {
		let mut chars = chunk.chars();
		let op = match chars.next() {
			Some(op) => op,
			None => continue,
		};
		let arg = chars.as_str();
		let _ = match op {
			'<' => w.start_element(arg),
			'/' => w.end_element(),
			'e' => w.empty_element(arg),
			'a' => w.start_element_in(arg, Some("a")),
			'b' => w.empty_element_in(arg, Some("b")),
			'n' => w.set_current_namespace(Some(arg)),
			'0' => w.set_current_namespace(None),
			'=' => w.attribute(arg, arg),
			'@' => w.prefixed_attribute("a", arg, arg),
			'!' => w.comment(arg),
			'?' => w.processing_instruction(arg),
			'&' => w.entity_ref(arg),
			'[' => w.cdata(arg),
			_ => w.characters(arg),
		};
	}
	w.end_doc()?;
	Ok(w.into_sink().into_inner()?)
}

fn main() {
	fuzz!(|data: &[u8]| {
		let text = match std::str::from_utf8(data) {
			Ok(text) => text,
			Err(_) => return,
		};
		let chunks: Vec<&str> = text.split('\0').collect();
		if let Ok(out) = drive(&chunks) {
			if std::str::from_utf8(&out).is_err() {
				panic!("writer produced invalid utf-8")
			}
		}
	});
}
