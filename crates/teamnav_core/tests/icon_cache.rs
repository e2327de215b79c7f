use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::JoinHandle;

use teamnav_core::{CardIcon, IconCacheError, IconCacheFetcher, ICON_PUBLIC_PREFIX};

/// Serves exactly one HTTP response on a throwaway local port.
fn serve_once(status_line: &'static str, body: &'static [u8]) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request);
            let header = format!(
                "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(body);
        }
    });
    (addr, handle)
}

fn assert_cached_path_shape(src: &str, extension: &str) {
    let relative = src
        .strip_prefix(ICON_PUBLIC_PREFIX)
        .unwrap_or_else(|| panic!("`{src}` should start with `{ICON_PUBLIC_PREFIX}`"))
        .trim_start_matches('/');
    let (date, file) = relative.split_once('/').expect("date folder and file name");
    assert_eq!(date.len(), 8);
    assert!(date.chars().all(|ch| ch.is_ascii_digit()));
    assert!(file.ends_with(extension));
}

#[test]
fn local_src_passes_through_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = IconCacheFetcher::try_new(dir.path()).unwrap();

    let icon = CardIcon::from_src("images/local.png");
    let out = fetcher.cache_icon(icon.clone()).unwrap();
    assert_eq!(out, icon);

    let absolute = CardIcon::from_src("/ext-resources/images/20240101/old.png");
    let out = fetcher.cache_icon(absolute.clone()).unwrap();
    assert_eq!(out, absolute);
}

#[test]
fn successful_download_rewrites_src_and_stores_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = IconCacheFetcher::try_new(dir.path()).unwrap();

    let payload: &[u8] = b"\x89PNG-not-really";
    let (addr, server) = serve_once("HTTP/1.1 200 OK", payload);

    let icon = CardIcon::from_src(format!("http://{addr}/logo.png"));
    let cached = fetcher.cache_icon(icon).unwrap();
    server.join().unwrap();

    assert_cached_path_shape(&cached.src, ".png");
    let on_disk = dir.path().join(cached.src.trim_start_matches('/'));
    assert_eq!(std::fs::read(&on_disk).unwrap(), payload);
}

#[test]
fn refused_connection_keeps_remote_src_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = IconCacheFetcher::try_new(dir.path()).unwrap();

    // bind then drop so the port is very likely unoccupied
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let src = format!("http://{addr}/logo.png");
    let cached = fetcher.cache_icon(CardIcon::from_src(src.clone())).unwrap();
    assert_eq!(cached.src, src);
}

#[test]
fn non_success_status_keeps_remote_src_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = IconCacheFetcher::try_new(dir.path()).unwrap();

    let (addr, server) = serve_once("HTTP/1.1 404 Not Found", b"gone");
    let src = format!("http://{addr}/logo.png");
    let cached = fetcher.cache_icon(CardIcon::from_src(src.clone())).unwrap();
    server.join().unwrap();

    assert_eq!(cached.src, src);
}

#[test]
fn unwritable_storage_root_is_a_fatal_resource_write_error() {
    let dir = tempfile::tempdir().unwrap();
    // occupy the storage root path with a plain file
    let blocked_root = dir.path().join("root-as-file");
    std::fs::write(&blocked_root, b"in the way").unwrap();

    let fetcher = IconCacheFetcher::try_new(&blocked_root).unwrap();
    let err = fetcher
        .cache_icon(CardIcon::from_src("http://127.0.0.1:1/logo.png"))
        .unwrap_err();
    assert!(matches!(err, IconCacheError::ResourceWrite { .. }));
}

#[test]
fn decoration_survives_the_cache_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = IconCacheFetcher::try_new(dir.path()).unwrap();

    let (addr, server) = serve_once("HTTP/1.1 200 OK", b"svg-bytes");
    let icon = CardIcon {
        src: format!("http://{addr}/icon.svg?v=3"),
        text: Some("CI".to_string()),
        color: Some("#112233".to_string()),
    };
    let cached = fetcher.cache_icon(icon).unwrap();
    server.join().unwrap();

    assert_cached_path_shape(&cached.src, ".svg");
    assert_eq!(cached.text.as_deref(), Some("CI"));
    assert_eq!(cached.color.as_deref(), Some("#112233"));
}
