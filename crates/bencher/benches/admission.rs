use std::hint::black_box;
use bencher::{fixture_gate, CaseGroup, RequestCase};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use http::Request;
use http::header::CONTENT_LENGTH;
use micro_gate::{decide, RequestFacts, SizeLimit};
use micro_gate_http::codec::HeaderDecoder;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

static SMALL_HEAD: RequestCase = RequestCase::admitted("small_head", include_str!("../resources/request/post_small.txt"));
static LARGE_HEAD: RequestCase = RequestCase::admitted("large_head", include_str!("../resources/request/post_large.txt"));

fn create_gate_cases() -> Vec<RequestCase> {
    vec![
        RequestCase::admitted("recognized_within_default", "POST /api/data HTTP/1.1\r\nContent-Length: 1000\r\n\r\n"),
        RequestCase::rejected("recognized_oversized", "POST /api/data HTTP/1.1\r\nContent-Length: 1001\r\n\r\n"),
        RequestCase::admitted("override_raised", "POST /upload HTTP/1.1\r\nContent-Length: 1500\r\n\r\n"),
        RequestCase::admitted("declared_cap", "PUT /files/report.pdf HTTP/1.1\r\nContent-Length: 4096\r\n\r\n"),
        RequestCase::rejected("unrecognized_oversized", "POST /missing HTTP/1.1\r\nContent-Length: 900\r\n\r\n"),
    ]
}

fn benchmark_header_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("header_decoder");

    for case in [SMALL_HEAD, LARGE_HEAD] {
        group.throughput(Throughput::Bytes(case.head().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            let mut header_decoder = HeaderDecoder;
            b.iter_batched_ref(
                || BytesMut::from(case.head()),
                |bytes_mut| {
                    let header = header_decoder.decode(bytes_mut).expect("input should be valid http request header").unwrap();
                    black_box(header.facts());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_gate_check(criterion: &mut Criterion) {
    let gate = fixture_gate();
    let mut group = criterion.benchmark_group("gate_check");

    for case in create_gate_cases() {
        let header = HeaderDecoder.decode(&mut BytesMut::from(case.head())).expect("input should be valid http request header").unwrap();
        let facts = header.facts();
        assert_eq!(gate.check(&facts).is_admitted(), case.group() == CaseGroup::Admitted, "{}", case.name());

        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &facts, |b, facts| {
            b.iter(|| black_box(gate.check(black_box(facts))));
        });
    }

    group.finish();
}

fn benchmark_decide(criterion: &mut Criterion) {
    let request = Request::post("/api/data").header(CONTENT_LENGTH, 1001).body(()).unwrap();
    let facts = RequestFacts::from_request(&request);
    let limits = [
        ("numeric", SizeLimit::Numeric(1000)),
        ("never_check", SizeLimit::NeverCheck),
        ("predicate", SizeLimit::predicate(|_, size| size.is_some_and(|size| size > 1000))),
    ];

    let mut group = criterion.benchmark_group("decide");
    for (name, limit) in &limits {
        group.bench_with_input(BenchmarkId::from_parameter(name), limit, |b, limit| {
            b.iter(|| black_box(decide(black_box(&facts), black_box(limit), None)));
        });
    }
    group.finish();
}

criterion_group!(admission, benchmark_header_decoder, benchmark_gate_check, benchmark_decide);
criterion_main!(admission);
