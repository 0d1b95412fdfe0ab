use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use serde_json::Value;

pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 8, Rgb(color));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a thread-local subscriber and returns what it logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

type Inbox = Mutex<Vec<Value>>;

/// In-process stand-in for the sorting device's `/servo` endpoint.
pub struct FakeDevice {
    pub base_url: String,
    inbox: Arc<Inbox>,
    handle: ServerHandle,
}

async fn record(
    inbox: web::Data<Inbox>,
    status: web::Data<StatusCode>,
    body: web::Json<Value>,
) -> HttpResponse {
    inbox.lock().unwrap().push(body.into_inner());
    HttpResponse::build(**status).finish()
}

impl FakeDevice {
    /// Must be called from inside an actix system, e.g. `#[actix_web::test]`.
    pub fn start(status: u16) -> std::io::Result<Self> {
        let inbox: Arc<Inbox> = Arc::default();
        let data = web::Data::from(inbox.clone());
        let status = StatusCode::from_u16(status).unwrap();

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .app_data(web::Data::new(status))
                .route("/servo", web::post().to(record))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_rt::spawn(server);

        Ok(Self {
            base_url: format!("http://{addr}"),
            inbox,
            handle,
        })
    }

    pub fn received(&self) -> Vec<Value> {
        self.inbox.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}
