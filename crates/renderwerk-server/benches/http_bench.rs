// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for HTTP request-head parsing in renderwerk-server.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use renderwerk_server::http::parse_request_head;

fn bench_parse_request_head(c: &mut Criterion) {
    let mut raw = b"POST /preview?type=video&max_width=0&max_height=150&timeout_ms=30000 HTTP/1.1\r\n\
                    Host: render.internal:50051\r\n\
                    User-Agent: renderwerk-client/0.3\r\n\
                    Accept: */*\r\n\
                    X-Timeout-Ms: 30000\r\n\
                    Content-Type: application/octet-stream\r\n\
                    Content-Length: 1048576\r\n\r\n"
        .to_vec();
    raw.extend(std::iter::repeat_n(0u8, 4096));

    c.bench_function("parse_request_head (preview)", |b| {
        b.iter(|| black_box(parse_request_head(black_box(&raw)).ok()));
    });
}

criterion_group!(benches, bench_parse_request_head);
criterion_main!(benches);
