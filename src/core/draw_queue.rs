use crate::error::{Error, Result};
use crate::game::note::NoteType;
use log::error;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub type TaskResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Fixed draw bands, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum DrawLayer {
    Line = 0,
    Hold = 1,
    Drag = 2,
    Tap = 3,
    Flick = 4,
    HitFx = 5,
}

impl DrawLayer {
    #[inline(always)]
    pub const fn priority(self) -> i32 {
        self as i32
    }

    pub const fn for_note(note_type: NoteType) -> Self {
        match note_type {
            NoteType::Hold => Self::Hold,
            NoteType::Drag => Self::Drag,
            NoteType::Tap => Self::Tap,
            NoteType::Flick => Self::Flick,
        }
    }
}

struct Task<'a> {
    priority: i32,
    run: Box<dyn FnOnce() -> TaskResult + 'a>,
}

/// One-shot, priority-ordered batch of deferred draw tasks.
///
/// Tasks run in ascending priority; equal priorities keep insertion order.
/// A failing or panicking task is logged and skipped, the rest still run.
#[derive(Default)]
pub struct DrawQueue<'a> {
    tasks: Vec<Task<'a>>,
    ran: bool,
}

impl<'a> DrawQueue<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn add_task<F>(&mut self, priority: i32, task: F) -> Result<()>
    where
        F: FnOnce() -> TaskResult + 'a,
    {
        if self.ran {
            error!("Draw task (priority {priority}) added after the queue ran; dropped.");
            return Err(Error::DrawQueueClosed);
        }
        // After every task of equal priority already queued.
        let idx = self.tasks.partition_point(|t| t.priority <= priority);
        self.tasks.insert(idx, Task { priority, run: Box::new(task) });
        Ok(())
    }

    #[inline(always)]
    pub fn add_layer_task<F>(&mut self, layer: DrawLayer, task: F) -> Result<()>
    where
        F: FnOnce() -> TaskResult + 'a,
    {
        self.add_task(layer.priority(), task)
    }

    /// Runs every task and closes the queue. Returns how many tasks failed.
    pub fn run(&mut self) -> usize {
        self.ran = true;
        let mut failed = 0;
        for (i, task) in self.tasks.drain(..).enumerate() {
            let priority = task.priority;
            match panic::catch_unwind(AssertUnwindSafe(task.run)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    error!("Draw task #{i} (priority {priority}) failed: {e}");
                }
                Err(payload) => {
                    failed += 1;
                    error!(
                        "Draw task #{i} (priority {priority}) panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        failed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
