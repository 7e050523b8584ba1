//! System call numbers
//!
//! Fixed by the user-mode ABI. Values must not be reordered.

/// System call numbers.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Syscall {
    // === Process control ===
    /// Power off the machine.
    Halt = 0,
    /// Terminate this process.
    Exit = 1,
    /// Start another process.
    Exec = 2,
    /// Wait for a child process to die.
    Wait = 3,

    // === Files ===
    Create = 4,
    Remove = 5,
    Open = 6,
    Filesize = 7,
    Read = 8,
    Write = 9,
    Seek = 10,
    Tell = 11,
    Close = 12,

    // === Memory mapping ===
    Mmap = 13,
    Munmap = 14,

    // === Directories ===
    Chdir = 15,
    Mkdir = 16,
    Readdir = 17,
    Isdir = 18,
    Inumber = 19,
}

/// Number of slots in the descriptor table.
pub const SYSCALL_COUNT: usize = Syscall::Inumber as usize + 1;

impl Syscall {
    /// Every syscall, in number order.
    pub const ALL: [Syscall; SYSCALL_COUNT] = [
        Syscall::Halt,
        Syscall::Exit,
        Syscall::Exec,
        Syscall::Wait,
        Syscall::Create,
        Syscall::Remove,
        Syscall::Open,
        Syscall::Filesize,
        Syscall::Read,
        Syscall::Write,
        Syscall::Seek,
        Syscall::Tell,
        Syscall::Close,
        Syscall::Mmap,
        Syscall::Munmap,
        Syscall::Chdir,
        Syscall::Mkdir,
        Syscall::Readdir,
        Syscall::Isdir,
        Syscall::Inumber,
    ];

    /// Decode a raw syscall number.
    pub const fn from_number(num: i32) -> Option<Self> {
        if num < 0 || num as usize >= SYSCALL_COUNT {
            return None;
        }
        Some(Self::ALL[num as usize])
    }

    #[inline]
    pub const fn number(self) -> i32 {
        self as i32
    }

    /// Get the syscall name for logging.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Exit => "exit",
            Self::Exec => "exec",
            Self::Wait => "wait",
            Self::Create => "create",
            Self::Remove => "remove",
            Self::Open => "open",
            Self::Filesize => "filesize",
            Self::Read => "read",
            Self::Write => "write",
            Self::Seek => "seek",
            Self::Tell => "tell",
            Self::Close => "close",
            Self::Mmap => "mmap",
            Self::Munmap => "munmap",
            Self::Chdir => "chdir",
            Self::Mkdir => "mkdir",
            Self::Readdir => "readdir",
            Self::Isdir => "isdir",
            Self::Inumber => "inumber",
        }
    }
}
