// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// renderwerk-server: Network transport for the Renderwerk pipelines.
//
// A minimal HTTP/1.1 server over raw TCP: `POST /preview`, `POST /ocr` and
// `GET /health`. One request per connection; the body is framed by
// `Content-Length`.

pub mod http;
pub mod server;
pub mod service;

pub use server::RenderServer;
pub use service::RenderService;
