//! Intrusive, allocation-free doubly-linked lists over [`Task`].
//!
//! The run queue and every mutex/event wait queue are instances of
//! [`TaskList`] built on the task's `queue_link` field; the timer service
//! in `timer.rs` is a second, separately-linked instance built on
//! `timer_link`. A task can sit in one queue list and the timer list at
//! the same time (the WAITING-with-timeout case), which is exactly why the
//! two link fields are distinct instead of sharing one.
//!
//! No allocation: every node is a task that already exists; the list only
//! ever stores `NonNull<Task>` pointers into caller-owned stack memory.

use crate::task::Task;
use core::ptr::NonNull;

/// `LinkField` for the run queue and every mutex/event wait queue, built on
/// a task's `queue_link`.
pub(crate) unsafe fn queue_link_of(mut task: NonNull<Task>) -> *mut Link {
    &mut task.as_mut().queue_link as *mut _
}

/// Prev/next hooks for one list a task can belong to.
#[derive(Debug)]
pub(crate) struct Link {
    prev: Option<NonNull<Task>>,
    next: Option<NonNull<Task>>,
}

impl Link {
    pub(crate) const fn new() -> Self {
        Link {
            prev: None,
            next: None,
        }
    }
}

/// Which embedded [`Link`] field a [`TaskList`] instance operates on.
///
/// A plain function pointer rather than a trait keeps this allocation-free
/// and lets one `TaskList` type serve both the queue list and the timer
/// list without generics leaking into every call site.
pub(crate) type LinkField = unsafe fn(NonNull<Task>) -> *mut Link;

/// FIFO intrusive doubly-linked list of tasks.
pub(crate) struct TaskList {
    head: Option<NonNull<Task>>,
    tail: Option<NonNull<Task>>,
    field: LinkField,
}

impl TaskList {
    pub(crate) const fn new(field: LinkField) -> Self {
        TaskList {
            head: None,
            tail: None,
            field,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn front(&self) -> Option<NonNull<Task>> {
        self.head
    }

    // Safety: every call below dereferences pointers obtained from `field`,
    // which always points at a `Link` embedded in a live `Task` (tasks are
    // never freed by this crate; the caller owns their storage per the
    // crate's ownership contract).
    unsafe fn link_of(&self, task: NonNull<Task>) -> *mut Link {
        (self.field)(task)
    }

    /// Appends `task` to the tail. `task` must not already be linked into
    /// this list (or any list sharing its link field).
    pub(crate) fn push_back(&mut self, task: NonNull<Task>) {
        unsafe {
            let link = &mut *self.link_of(task);
            link.prev = self.tail;
            link.next = None;
        }
        match self.tail {
            Some(old_tail) => unsafe {
                (*self.link_of(old_tail)).next = Some(task);
            },
            None => self.head = Some(task),
        }
        self.tail = Some(task);
    }

    /// Removes and returns the head of the list, if any.
    pub(crate) fn pop_front(&mut self) -> Option<NonNull<Task>> {
        let head = self.head?;
        self.remove(head);
        Some(head)
    }

    /// The task immediately after `task` in this list, if any. Used by
    /// the timer service to walk the list while searching for a sorted
    /// insertion point.
    pub(crate) fn next_of(&self, task: NonNull<Task>) -> Option<NonNull<Task>> {
        unsafe { (*self.link_of(task)).next }
    }

    /// Inserts `task` immediately before `existing`, which must already be
    /// linked into this list.
    pub(crate) fn insert_before(&mut self, existing: NonNull<Task>, task: NonNull<Task>) {
        let prev = unsafe { (*self.link_of(existing)).prev };
        unsafe {
            let link = &mut *self.link_of(task);
            link.prev = prev;
            link.next = Some(existing);
        }
        match prev {
            Some(p) => unsafe { (*self.link_of(p)).next = Some(task) },
            None => self.head = Some(task),
        }
        unsafe { (*self.link_of(existing)).prev = Some(task) };
    }

    /// Removes `task` from this list. `task` must currently be linked into
    /// this exact list; removing a task that isn't present is a caller bug.
    pub(crate) fn remove(&mut self, task: NonNull<Task>) {
        let (prev, next) = unsafe {
            let link = &*self.link_of(task);
            (link.prev, link.next)
        };
        match prev {
            Some(p) => unsafe { (*self.link_of(p)).next = next },
            None => self.head = next,
        }
        match next {
            Some(n) => unsafe { (*self.link_of(n)).prev = prev },
            None => self.tail = prev,
        }
        unsafe {
            let link = &mut *self.link_of(task);
            link.prev = None;
            link.next = None;
        }
    }

    /// Iterator over the list in FIFO order. Only safe to use when no task
    /// in the list is mutated through another alias while iterating.
    pub(crate) fn iter(&self) -> TaskListIter<'_> {
        TaskListIter {
            list: self,
            next: self.head,
        }
    }
}

pub(crate) struct TaskListIter<'a> {
    list: &'a TaskList,
    next: Option<NonNull<Task>>,
}

impl Iterator for TaskListIter<'_> {
    type Item = NonNull<Task>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = unsafe { (*self.list.link_of(current)).next };
        Some(current)
    }
}
