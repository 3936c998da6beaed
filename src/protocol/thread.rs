use std::{
    io,
    sync::{Arc, Mutex, PoisonError, mpsc},
    thread,
};

use crate::LogSink;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of worker threads pulling connection jobs from a shared queue.
#[derive(Debug)]
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<Job>>,
    log: LogSink,
}

impl ThreadPool {
    /// # Panics
    /// If `size` is zero.
    pub fn new(size: usize, log: LogSink) -> io::Result<Self> {
        assert!(size > 0);

        let mut workers = Vec::with_capacity(size);
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..size {
            workers.push(Worker::spawn(i, Arc::clone(&receiver), log)?);
        }

        Ok(Self {
            workers,
            sender: Some(sender),
            log,
        })
    }

    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        if sender.send(Box::new(f)).is_err() {
            self.log
                .error(format_args!("no worker left to accept the connection"));
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());

        for worker in self.workers.drain(..) {
            self.log
                .debug(format_args!("shutting down worker {}", worker.id));
            if worker.thread.join().is_err() {
                self.log
                    .error(format_args!("worker {} panicked", worker.id));
            }
        }
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn spawn(
        id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
        log: LogSink,
    ) -> io::Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("lotto-worker-{id}"))
            .spawn(move || {
                loop {
                    let msg = receiver
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .recv();
                    match msg {
                        Ok(job) => {
                            log.debug(format_args!("worker {id} handling a connection"));
                            job();
                        }
                        Err(_) => {
                            log.debug(format_args!("worker {id} disconnected"));
                            break;
                        }
                    }
                }
            })?;

        Ok(Self { id, thread })
    }
}
