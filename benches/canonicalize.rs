use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use smev_transform::{
	canonicalize, canonicalize_bytes, CanonicalEvent, Options, SignatureInput, SmevTransform,
	Transform, XmlReader,
};

static SHORT_MESSAGE: &'static [u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<tns:SendRequest xmlns:tns="urn://x-artefacts-smev-gov-ru/services/message-exchange/types/1.1" Id="SIGNED_BY_CONSUMER">
	<MessagePrimaryContent xmlns="urn://x-artefacts-smev-gov-ru/services/message-exchange/types/basic/1.1">
		<req:Request xmlns:req="urn://example/request" req:kind="full" attr="v">Hello</req:Request>
	</MessagePrimaryContent>
</tns:SendRequest>"#;

fn large_message(records: usize) -> Vec<u8> {
	let mut doc = String::from(
		"<r:Registry xmlns:r='urn://example/registry' xmlns:p='urn://example/person' xmlns:a='urn://example/address'>\n",
	);
	for i in 0..records {
		doc.push_str(&format!(
			"  <p:Person p:id='{}' status='active' a:ref='addr-{}'>\n    <p:Name>Person &amp; number {}</p:Name>\n    <a:Address a:kind='home'><a:City>City {}</a:City></a:Address>\n  </p:Person>\n",
			i, i, i, i
		));
	}
	doc.push_str("</r:Registry>");
	doc.into_bytes()
}

fn short_document(c: &mut Criterion) {
	let mut group = c.benchmark_group("short");
	group.throughput(Throughput::Bytes(SHORT_MESSAGE.len() as u64));

	group.bench_function("bytes", |b| {
		b.iter(|| canonicalize_bytes(black_box(SHORT_MESSAGE), &Options::default()).unwrap());
	});

	group.bench_function("transform", |b| {
		let t = SmevTransform::new();
		let input = SignatureInput::from(SHORT_MESSAGE);
		b.iter(|| t.perform(black_box(&input)).unwrap());
	});
}

fn large_document(c: &mut Criterion) {
	let doc = large_message(500);
	let mut group = c.benchmark_group("large");
	group.throughput(Throughput::Bytes(doc.len() as u64));

	group.bench_function("bytes", |b| {
		b.iter(|| canonicalize_bytes(black_box(&doc), &Options::default()).unwrap());
	});

	group.bench_function("events", |b| {
		let mut evs: Vec<CanonicalEvent> = Vec::with_capacity(16384);
		b.iter(|| {
			evs.clear();
			canonicalize(
				XmlReader::from_bytes(black_box(&doc)),
				&mut evs,
				&Options::default(),
			)
			.unwrap();
		});
	});
}

criterion_group! {
	name = benches;
	config = Criterion::default().sample_size(100);
	targets = short_document, large_document
}
criterion_main!(benches);
