//! SerialLineHandler - demo entry point
//!
//! Brings up one handler, a dispatcher task, a writer task and two reader
//! tasks. On target the tasks are FreeRTOS-backed pthreads; on the host
//! they are plain threads.
//!
//! ```text
//! writer ──▶ line_input ──▶ dispatcher ──┬──▶ reader 1
//!                                        └──▶ reader 2
//! ```

use std::thread;
use std::time::Duration;

use serial_line_handler::{
    CountingPool, Dispatcher, Handler, Kernel, MessageQueues, QueueId, Session, HANDLER_READER_MAX,
    LINE_MAX_LEN, VERSION,
};

const DEMO_LINES: &[&[u8]] = &[b"hello\n", b"line handler up\n", b"bye\n"];
const TASK_STACK_SIZE: usize = 8 * 1024;

/// Everything the demo tasks share. Leaked once at start-up.
struct Demo<K, Q> {
    handler: Handler,
    kernel: K,
    queues: Q,
    pool: CountingPool,
}

impl<K, Q> Demo<K, Q>
where
    K: Kernel + Send + 'static,
    Q: MessageQueues + Send + 'static,
{
    fn session(&self) -> Session<'_, K, Q, CountingPool, HANDLER_READER_MAX> {
        Session::new(&self.handler, &self.kernel, &self.queues, &self.pool)
    }

    fn spawn<F>(&'static self, name: &str, f: F) -> thread::JoinHandle<()>
    where
        F: FnOnce(&'static Self) + Send + 'static,
    {
        thread::Builder::new()
            .name(name.into())
            .stack_size(TASK_STACK_SIZE)
            .spawn(move || f(self))
            .unwrap_or_else(|e| panic!("failed to spawn {}: {}", name, e))
    }

    fn run(&'static self, reader_queues: [QueueId; 2]) {
        self.spawn("dispatch", |demo| {
            Dispatcher::new(&demo.handler, &demo.kernel, &demo.queues, &demo.pool).run()
        });

        let readers: Vec<_> = reader_queues
            .into_iter()
            .enumerate()
            .map(|(n, queue)| {
                self.spawn(&format!("reader{}", n + 1), move |demo| reader_task(demo, queue))
            })
            .collect();

        // Let the readers register before the first line goes out
        thread::sleep(Duration::from_millis(100));

        let writer = self.spawn("writer", writer_task);
        let _ = writer.join();
        for reader in readers {
            let _ = reader.join();
        }
        log::info!("Demo finished ({} messages in use)", self.pool.in_use());
    }
}

fn reader_task<K, Q>(demo: &'static Demo<K, Q>, queue: QueueId)
where
    K: Kernel + Send + 'static,
    Q: MessageQueues + Send + 'static,
{
    let session = demo.session();
    let task = demo.kernel.current_task();

    if !session.open_read(queue) {
        log::warn!("{} could not register for reading", task);
        return;
    }

    let mut line = [0u8; LINE_MAX_LEN];
    for _ in DEMO_LINES {
        if let Some(len) = session.read_line_len(&mut line) {
            log::info!("{} got {:?}", task, String::from_utf8_lossy(&line[..len]));
        }
    }
    session.close();
}

fn writer_task<K, Q>(demo: &'static Demo<K, Q>)
where
    K: Kernel + Send + 'static,
    Q: MessageQueues + Send + 'static,
{
    let session = demo.session();

    let Some(queue) = session.open_write() else {
        log::warn!("Line input already taken");
        return;
    };

    for line in DEMO_LINES {
        session.write_line(queue, line);
    }
    session.close();
}

#[cfg(target_os = "espidf")]
fn main() {
    use serial_line_handler::config::QUEUE_DEPTH;
    use serial_line_handler::platform::esp::{EspKernel, EspQueues};

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("{}", VERSION);

    // char input, line input, two readers
    let queues = EspQueues::new(4, QUEUE_DEPTH);
    let (Some(char_input), Some(line_input), Some(r1), Some(r2)) =
        (queues.id(0), queues.id(1), queues.id(2), queues.id(3))
    else {
        log::error!("Queue setup failed");
        return;
    };

    let handler = match Handler::new(char_input, line_input) {
        Ok(handler) => handler,
        Err(fault) => {
            log::error!("Handler init failed: {}", fault);
            return;
        }
    };

    let demo: &'static Demo<EspKernel, EspQueues> = Box::leak(Box::new(Demo {
        handler,
        kernel: EspKernel::new(),
        queues,
        pool: CountingPool::new(),
    }));
    demo.run([r1, r2]);

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use serial_line_handler::platform::host::{HostKernel, HostQueues};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("{}", VERSION);

    let queues = HostQueues::new();
    let char_input = queues.create();
    let line_input = queues.create();
    let readers = [queues.create(), queues.create()];

    let handler = match Handler::new(char_input, line_input) {
        Ok(handler) => handler,
        Err(fault) => {
            log::error!("Handler init failed: {}", fault);
            std::process::exit(1);
        }
    };

    let demo: &'static Demo<HostKernel, HostQueues> = Box::leak(Box::new(Demo {
        handler,
        kernel: HostKernel::new(),
        queues,
        pool: CountingPool::new(),
    }));

    demo.run(readers);
}
