// Custom font downloads over a local HTTP server
#![cfg(feature = "http")]

use kas_dynfont::{
    Callbacks, Completion, Config, Font, FontAcquisitionService, FontRegistry, HttpTransport,
    MemorySettings, RegisterError,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Registers data as the UTF-8 font name it contains
#[derive(Default)]
struct Names(HashSet<String>);

impl FontRegistry for Names {
    fn register(&mut self, data: Vec<u8>) -> Result<(), RegisterError> {
        let name =
            String::from_utf8(data).map_err(|_| ttf_parser::FaceParsingError::UnknownMagic)?;
        self.0.insert(name);
        Ok(())
    }

    fn font(&self, name: &str, size: f32) -> Option<Font> {
        self.0.contains(name).then(|| Font::new(name, name, size))
    }
}

/// Serve `response` to one connection, returning the request head
fn serve(response: String) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/Acme-Bold.ttf", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut byte = [0u8];
        while !head.ends_with(b"\r\n\r\n") {
            stream.read_exact(&mut byte).unwrap();
            head.push(byte[0]);
        }
        stream.write_all(response.as_bytes()).unwrap();
        String::from_utf8(head).unwrap().to_ascii_lowercase()
    });
    (url, handle)
}

fn service(tmp: &tempfile::TempDir) -> FontAcquisitionService {
    let config = ureq::Agent::config_builder().proxy(None).build();
    FontAcquisitionService::builder(Config::in_dir(tmp.path()))
        .registry(Names::default())
        .transport(HttpTransport::with_agent(ureq::Agent::new_with_config(
            config,
        )))
        .settings(MemorySettings::default())
        .build()
}

fn poll_until_idle(service: &mut FontAcquisitionService) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !service.is_idle() {
        assert!(Instant::now() < deadline, "transfer did not finish");
        service.poll();
        thread::sleep(Duration::from_millis(5));
    }
}

fn recorder() -> (Callbacks, Rc<RefCell<Vec<f32>>>, Rc<RefCell<Option<Completion>>>) {
    let progress = Rc::new(RefCell::new(Vec::new()));
    let completion = Rc::new(RefCell::new(None));
    let (p, c) = (progress.clone(), completion.clone());
    let callbacks = Callbacks::new()
        .on_progress(move |x| p.borrow_mut().push(x))
        .on_complete(move |done| *c.borrow_mut() = Some(done));
    (callbacks, progress, completion)
}

#[test_log::test]
fn download_and_register() {
    let tmp = tempfile::tempdir().unwrap();
    let mut service = service(&tmp);
    let (url, server) = serve(
        "HTTP/1.1 200 OK\r\nContent-Length: 9\r\nConnection: close\r\n\r\nAcme-Bold".to_string(),
    );

    let (callbacks, progress, completion) = recorder();
    service.download_custom_font("Acme-Bold", &url, callbacks);
    poll_until_idle(&mut service);

    assert!(matches!(*completion.borrow(), Some(Completion::Available)));
    assert_eq!(progress.borrow().last(), Some(&1.0));
    assert_eq!(
        std::fs::read(tmp.path().join("fonts").join("Acme-Bold")).unwrap(),
        b"Acme-Bold"
    );
    assert!(service.is_available("Acme-Bold"));

    let request = server.join().unwrap();
    assert!(request.contains("\r\nreferer: http://app.wodedata.com\r\n"));
}

#[test_log::test]
fn server_error_stores_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let mut service = service(&tmp);
    let (url, _server) = serve(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string(),
    );

    let (callbacks, _, completion) = recorder();
    service.download_custom_font("Acme-Bold", &url, callbacks);
    poll_until_idle(&mut service);

    assert!(matches!(
        *completion.borrow(),
        Some(Completion::TransferFailed(_))
    ));
    assert!(!service.font_directory().contains("Acme-Bold"));
}
