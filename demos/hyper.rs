//
//  Sample application.
//
//  Serves an in-memory filesystem over plain http on localhost.
//  Connect to http://localhost:4918/
//

use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;

use clap::Parser;
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use dav_dispatch::{
    DavHandler, DavMethodSet, acl::DavAcl, memfs::MemFs, memls::MemLs, memprops::MemProps, sendfile::SendFile,
};

#[derive(Debug, clap::Parser)]
#[clap(about, version)]
struct Cli {
    /// port to listen on
    #[clap(short = 'p', long, default_value = "4918")]
    port: u16,
    /// url prefix to strip from request paths
    #[clap(long, default_value = "")]
    prefix: String,
    /// only allow reading and listing
    #[clap(short = 'r', long)]
    read_only: bool,
    /// allowed methods, e.g. "webdav-ro" or "GET,PUT,PROPFIND"
    #[clap(short = 'm', long)]
    methods: Option<String>,
    /// hand GET off to the front-end: "x-sendfile" or "x-accel-redir <prefix>"
    #[clap(long)]
    sendfile: Option<String>,
    /// directory the front-end serves files from, with --sendfile
    #[clap(long, default_value = "/srv/dav")]
    sendfile_root: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Cli::parse();

    let access = if args.read_only {
        DavAcl::read_only()
    } else {
        DavAcl::full()
    };
    let mut config = DavHandler::builder()
        .filesystem(MemFs::new())
        .propstore(MemProps::new())
        .locksystem(MemLs::new())
        .access(Box::new(access))
        .strip_prefix(args.prefix.as_str());
    if let Some(methods) = args.methods.as_ref() {
        let words = methods.split(',').map(str::trim).collect::<Vec<_>>();
        config = config.methods(DavMethodSet::from_vec(words)?);
    }
    if let Some(sendfile) = args.sendfile.as_ref() {
        config = config.sendfile(sendfile.parse::<SendFile>()?, args.sendfile_root.as_str());
    }
    let dav_server = config.build_handler();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = TcpListener::bind(addr).await?;
    println!("Serving memory filesystem on {}", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let dav_server = dav_server.clone();
        let io = TokioIo::new(stream);

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(
                    io,
                    service_fn(move |req| {
                        let dav_server = dav_server.clone();
                        async move { Ok::<_, Infallible>(dav_server.handle(req).await) }
                    }),
                )
                .await
            {
                eprintln!("Failed serving connection: {err:?}");
            }
        });
    }
}
