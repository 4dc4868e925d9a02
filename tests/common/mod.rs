#![allow(dead_code)]

pub mod http {
    use sol::dispatcher::Request;

    /// Build a request with an empty body.
    pub fn request(method: &str, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    /// Build a request with headers and a body.
    pub fn request_with(method: &str, uri: &str, headers: &[(&str, &str)], body: &[u8]) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(body.to_vec()).unwrap()
    }

    /// Body of a dispatched response as UTF-8.
    pub fn body_str(resp: &sol::dispatcher::Response) -> &str {
        std::str::from_utf8(resp.body()).unwrap()
    }
}

pub mod recorder {
    use parking_lot::Mutex;
    use sol::dispatcher::Context;
    use sol::HandlerFunc;
    use std::sync::Arc;

    /// Shared log of handler labels, in call order.
    #[derive(Clone, Default)]
    pub struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl Recorder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, label: &'static str) {
            self.0.lock().push(label);
        }

        pub fn take(&self) -> Vec<&'static str> {
            std::mem::take(&mut *self.0.lock())
        }

        /// Middleware that records `label` and continues the chain.
        pub fn mw(&self, label: &'static str) -> HandlerFunc {
            let rec = self.clone();
            HandlerFunc::new(move |c: &mut Context| {
                rec.push(label);
                c.next();
            })
        }

        /// Middleware that records `label` before and `label_out` after downstream work.
        pub fn around(&self, label: &'static str, label_out: &'static str) -> HandlerFunc {
            let rec = self.clone();
            HandlerFunc::new(move |c: &mut Context| {
                rec.push(label);
                c.next();
                rec.push(label_out);
            })
        }

        /// Terminal handler that records `label` without calling `next`.
        pub fn handler(&self, label: &'static str) -> HandlerFunc {
            let rec = self.clone();
            HandlerFunc::new(move |_c: &mut Context| rec.push(label))
        }
    }
}

pub mod test_server {
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod logs {
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Captures JSON log lines emitted on the current thread while alive.
    pub struct CapturedLogs {
        sink: Sink,
        _guard: tracing::subscriber::DefaultGuard,
    }

    impl CapturedLogs {
        pub fn init() -> Self {
            let sink = Sink::default();
            let writer = sink.clone();
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_max_level(tracing::Level::TRACE)
                .with_writer(move || writer.clone())
                .finish();
            let guard = tracing::subscriber::set_default(subscriber);
            Self {
                sink,
                _guard: guard,
            }
        }

        /// Parsed log lines so far.
        pub fn lines(&self) -> Vec<serde_json::Value> {
            let raw = self.sink.0.lock();
            String::from_utf8_lossy(&raw)
                .lines()
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect()
        }

        /// Lines whose message equals `message`.
        pub fn with_message(&self, message: &str) -> Vec<serde_json::Value> {
            self.lines()
                .into_iter()
                .filter(|line| line["fields"]["message"] == message)
                .collect()
        }
    }
}
