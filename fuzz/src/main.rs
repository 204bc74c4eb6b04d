#[macro_use]
extern crate afl;
extern crate smev_transform;

use std::io;

use smev_transform::{canonicalize_bytes, process, Options};

fn canonicalize_chunked(data: &[u8], chunk_size: usize) -> smev_transform::Result<Vec<u8>> {
	let mut out = Vec::new();
	process(
		io::BufReader::with_capacity(chunk_size, data),
		&mut out,
		&Options::default(),
	)?;
	Ok(out)
}

fn main() {
	fuzz!(|data: &[u8]| {
		if data.is_empty() {
			return;
		}
		// first byte selects the read buffer size
		let chunk_size = (data[0] as usize % 16) + 1;
		let data = &data[1..];

		let oneshot = canonicalize_bytes(data, &Options::default());
		let chunked = canonicalize_chunked(data, chunk_size);
		match (&oneshot, &chunked) {
			(Ok(a), Ok(b)) => assert_eq!(a, b, "output depends on chunking"),
			(Err(_), Err(_)) => (),
			_ => panic!("error state depends on chunking"),
		}

		// raw CR and whitespace in attribute values are normalized away by a
		// reparse, so only documents without them are expected to be stable
		let reparse_stable = |out: &[u8]| !out.iter().any(|b| matches!(b, b'\r' | b'\t' | b'\n'));
		if let Some(canonical) = oneshot.ok().filter(|v| reparse_stable(v)) {
			match canonicalize_bytes(&canonical, &Options::default()) {
				Ok(again) => assert_eq!(canonical, again, "canonical form is not a fixed point"),
				Err(e) => panic!("canonical form does not canonicalize: {}", e),
			}
		}
	});
}
