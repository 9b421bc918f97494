//
//  Sample application.
//
//  Listens on localhost:4918, plain http, no ssl.
//  Connect to http://localhost:4918/dav/
//

use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::str::FromStr;

use clap::Parser;
use futures_util::future::TryFutureExt;

use minidav::{body::Body, fs::memfs::MemFs, DavHandler, FileSystem};

#[derive(Debug, clap::Parser)]
#[command(about, version)]
struct Cli {
    /// port to listen on
    #[arg(short, long, default_value = "4918")]
    port: u16,
    /// local directory to serve
    #[arg(short, long)]
    dir: Option<String>,
    /// mount prefix
    #[arg(long, default_value = "/dav")]
    prefix: String,
    /// capacity reported by the memory filesystem, in bytes
    #[arg(short, long)]
    capacity: Option<u64>,
    /// make PROPFIND with Depth: infinity list the whole subtree
    #[arg(short, long)]
    recurse: bool,
}

async fn handle(
    dav_server: DavHandler,
    req: hyper::Request<hyper::Body>,
) -> Result<hyper::Response<Body>, Infallible> {
    Ok(dav_server.handle(req).await)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let Cli {
        port,
        dir,
        prefix,
        capacity,
        recurse,
    } = Cli::parse();

    let (fs, name) = match dir {
        Some(dir) => (FileSystem::local(dir.clone(), true), dir),
        None => {
            let memfs = match capacity {
                Some(total) => MemFs::with_capacity(total),
                None => MemFs::new(),
            };
            (FileSystem::Custom(memfs), "memory filesystem".to_string())
        }
    };
    let dav_server = DavHandler::builder(fs)
        .strip_prefix(prefix.clone())
        .recurse_infinity(recurse)
        .build();

    let make_service = hyper::service::make_service_fn(|_| {
        let dav_server = dav_server.clone();
        async move {
            let func = move |req| handle(dav_server.clone(), req);
            Ok::<_, hyper::Error>(hyper::service::service_fn(func))
        }
    });

    let addr = SocketAddr::from_str(&format!("0.0.0.0:{port}"))?;
    let server = hyper::Server::try_bind(&addr)?
        .serve(make_service)
        .map_err(|e| eprintln!("server error: {e}"));

    println!("Serving {name} on {port} under {prefix}");
    let _ = server.await;
    Ok(())
}
