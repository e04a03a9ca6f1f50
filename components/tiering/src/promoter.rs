//! Background promotion worker
//!
//! Compile requests travel over a channel to one named worker thread.
//! Submission never blocks and nothing is cancelled: if a request fails or
//! never finishes, its unit simply stays interpreted.

use crate::service::NativeCompiler;
use crate::state::PromotionState;
use crossbeam::channel::{unbounded, Sender};
use expr_tree::{LambdaTree, Variable};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Everything the native compiler needs for one unit.
pub struct CompileRequest {
    /// Diagnostic name of the unit
    pub unit: Arc<str>,
    /// Lambda tree the unit was compiled from
    pub tree: Arc<LambdaTree>,
    /// Captured variables, in closure-cell order
    pub captured: Arc<[Variable]>,
    /// Where to publish the result
    pub state: Arc<PromotionState>,
}

/// Counters describing promoter activity
#[derive(Debug, Default)]
pub struct PromoterStats {
    requested: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl PromoterStats {
    /// Compilations started
    pub fn requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }

    /// Compilations that published code
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Compilations the service rejected
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Owner of the promotion worker thread.
pub struct Promoter {
    compiler: Arc<dyn NativeCompiler>,
    stats: Arc<PromoterStats>,
    sender: Mutex<Option<Sender<CompileRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Promoter {
    /// Start the worker thread.
    pub fn spawn(compiler: Arc<dyn NativeCompiler>) -> io::Result<Arc<Self>> {
        let (sender, receiver) = unbounded::<CompileRequest>();
        let stats = Arc::new(PromoterStats::default());

        let worker_compiler = Arc::clone(&compiler);
        let worker_stats = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("light-promoter".into())
            .spawn(move || {
                for request in receiver.iter() {
                    run_request(worker_compiler.as_ref(), &worker_stats, request);
                }
                debug!("promotion worker stopped");
            })?;

        Ok(Arc::new(Self {
            compiler,
            stats,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
        }))
    }

    /// Queue a compilation on the worker.
    pub fn submit(&self, request: CompileRequest) {
        info!(unit = %request.unit, "promotion requested");
        self.stats.requested.fetch_add(1, Ordering::SeqCst);
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => {
                if let Err(err) = sender.send(request) {
                    warn!(unit = %err.0.unit, "promotion worker is gone; staying interpreted");
                }
            }
            None => warn!(unit = %request.unit, "promoter shut down; staying interpreted"),
        }
    }

    /// Compile on the calling thread.
    pub fn compile_now(&self, request: CompileRequest) {
        info!(unit = %request.unit, "synchronous promotion");
        self.stats.requested.fetch_add(1, Ordering::SeqCst);
        run_request(self.compiler.as_ref(), &self.stats, request);
    }

    /// Activity counters
    pub fn stats(&self) -> &PromoterStats {
        &self.stats
    }

    /// Stop accepting requests and wait for queued ones to finish.
    ///
    /// Called on the worker itself, the worker is detached instead of
    /// joined; it exits once the request in hand completes.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            if handle.thread().id() == thread::current().id() {
                debug!("promoter released on its own worker; detaching");
                return;
            }
            if handle.join().is_err() {
                warn!("promotion worker panicked");
            }
        }
    }
}

impl Drop for Promoter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_request(compiler: &dyn NativeCompiler, stats: &PromoterStats, request: CompileRequest) {
    match compiler.compile_to_native(&request.tree, &request.captured) {
        Ok(code) => {
            stats.completed.fetch_add(1, Ordering::SeqCst);
            request.state.complete(code);
            debug!(unit = %request.unit, "promotion published");
        }
        Err(message) => {
            stats.failed.fetch_add(1, Ordering::SeqCst);
            warn!(unit = %request.unit, %message, "native compilation failed");
        }
    }
}
