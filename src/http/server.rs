use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::http::{parse_request, Request, Response};
use crate::threadpool::ThreadPool;

/// Blocking HTTP/1.1 server used by the development backend.
///
/// It listens for incoming connections on a TCP socket, parses the requests and dispatches them
/// to a handler. Whatever the handler produces is then serialized and sent back to the client,
/// and the connection is closed.
pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    /// Create a new server listening on the given address. Port 0 picks a free port.
    pub fn new(addr: &str) -> Result<Self> {
        Ok(HttpServer {
            listener: TcpListener::bind(addr)?,
        })
    }

    /// Address the server actually listens on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the server
    ///
    /// Calls the handler with the incoming requests, concurrently on a thread pool sized to the
    /// available parallelism. This function blocks for as long as the listener yields
    /// connections.
    pub fn serve<F>(&self, handler: F)
    where
        F: Fn(Request) -> Response + Send + Sync + 'static + Clone,
    {
        let threadpool = ThreadPool::new(
            std::thread::available_parallelism()
                .map(|x| x.into())
                .unwrap_or(4),
        );
        for stream in self.listener.incoming() {
            match stream {
                Ok(mut stream) => {
                    let handler = handler.clone();
                    threadpool.execute(move || handle_stream(&mut stream, &handler))
                }
                Err(err) => warn!("Failed to accept connection: {}", err),
            }
        }
    }

    /// Utility function for one-shot servers.
    ///
    /// This is mostly for testing, it accepts a single connection, processes the request and
    /// returns.
    pub fn serve_once<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(Request) -> Response,
    {
        let (mut stream, _) = self.listener.accept()?;
        handle_stream(&mut stream, &handler);
        Ok(())
    }
}

/// Parse an HTTP request from a TCP stream, call the handler and write back the answer
fn handle_stream<F>(mut stream: &mut TcpStream, handler: F)
where
    F: Fn(Request) -> Response,
{
    let buf_reader = BufReader::new(&mut stream);
    let response = match parse_request(buf_reader) {
        Ok(req) => {
            debug!(method = %req.method, path = req.url.path(), "handling request");
            handler(req)
        }
        Err(err) => {
            warn!("Rejecting malformed request: {}", err);
            Response::error(400)
        }
    };
    respond(stream, response);
}

/// Writes an HTTP response to a stream
fn respond(stream: &mut TcpStream, resp: Response) {
    if let Err(err) = stream.write_all(&resp.to_bytes()) {
        warn!("Failed to respond: {}", err);
    }
}
