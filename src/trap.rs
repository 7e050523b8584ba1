//! i386 Syscall Trap Entry
//!
//! Registers the software-interrupt gate user code uses to enter the kernel
//! and turns each trap into a dispatch.
//!
//! # Gate
//! - Vector 0x30, DPL 3 (callable from ring 3), interrupts on
//!
//! # Security Considerations
//! - The frame is borrowed for one trap and never stored
//! - Termination and power-off are carried out here, after dispatch, so
//!   every validation failure takes the same exit path as a real `exit`

use spin::Once;

use crate::syscall::handler::{dispatch, Kernel, Outcome, SyscallCtx};

/// Interrupt vector of the syscall gate.
pub const SYSCALL_VECTOR: u8 = 0x30;

/// Descriptor privilege level of the syscall gate.
pub const SYSCALL_DPL: u8 = 3;

/// Page-fault error code bit: the access came from user mode.
pub const PF_USER: u32 = 1 << 2;

/// Interrupt frame pushed by the CPU and the common interrupt stub.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntrFrame {
    // Pushed by `pushal`.
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    /// Return-value slot.
    pub eax: u32,
    pub gs: u16,
    _gs_pad: u16,
    pub fs: u16,
    _fs_pad: u16,
    pub es: u16,
    _es_pad: u16,
    pub ds: u16,
    _ds_pad: u16,
    /// Interrupt vector number.
    pub vec_no: u32,
    /// Error code pushed by the CPU, or 0.
    pub error_code: u32,
    pub frame_pointer: u32,
    // Pushed by the CPU on entry.
    pub eip: u32,
    pub cs: u16,
    _cs_pad: u16,
    pub eflags: u32,
    /// User stack pointer at trap time.
    pub esp: u32,
    pub ss: u16,
    _ss_pad: u16,
}

const _: () = assert!(core::mem::size_of::<IntrFrame>() == 80);

impl IntrFrame {
    /// A frame for a syscall trap with the given user stack pointer.
    pub fn syscall(esp: u32) -> Self {
        Self {
            vec_no: u32::from(SYSCALL_VECTOR),
            esp,
            ..Self::default()
        }
    }
}

/// Interrupt state while a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrLevel {
    Off,
    On,
}

/// An interrupt handler.
pub type IntrHandler = fn(&mut IntrFrame);

/// The platform's interrupt registration facility.
pub trait InterruptController {
    /// Install `handler` on external-or-software vector `vec_no`.
    fn register_int(
        &mut self,
        vec_no: u8,
        dpl: u8,
        level: IntrLevel,
        handler: IntrHandler,
        name: &'static str,
    );
}

static KERNEL: Once<&'static dyn Kernel> = Once::new();

/// Install the syscall gate.
///
/// Must run before any process can trap. Only the first call's `kernel`
/// is kept.
pub fn syscall_init(kernel: &'static dyn Kernel, intc: &mut dyn InterruptController) {
    KERNEL.call_once(|| kernel);
    intc.register_int(
        SYSCALL_VECTOR,
        SYSCALL_DPL,
        IntrLevel::On,
        syscall_entry,
        "syscall",
    );
    log::info!(
        "[BOOT] Syscall gate installed on vector {:#04x}",
        SYSCALL_VECTOR
    );
}

fn syscall_entry(frame: &mut IntrFrame) {
    match KERNEL.get() {
        Some(kernel) => handle_syscall(frame, *kernel),
        None => log::error!("[TRAP] syscall before syscall_init"),
    }
}

/// Service one syscall trap against `kernel`.
pub fn handle_syscall(frame: &mut IntrFrame, kernel: &dyn Kernel) {
    let outcome = dispatch(&mut SyscallCtx::new(frame, kernel));
    complete(outcome, kernel);
}

/// Carry out the lifecycle half of a finished syscall.
///
/// `Return` resumes the caller. Its value is already in the frame.
pub fn complete(outcome: Outcome, kernel: &dyn Kernel) {
    match outcome {
        Outcome::Return(_) => {}
        Outcome::Exit(status) => kernel.exit_thread(status),
        Outcome::PowerOff => kernel.power_off(),
    }
}

/// The page-fault handler's half of the user-access contract.
///
/// For a fault raised in kernel mode, the faulting instruction is the
/// accessor's load and EAX holds its resume address. Jump there with
/// EAX = `0xFFFF_FFFF` so the accessor reports the failure.
///
/// Returns `false` (leaving the frame untouched) for user-mode faults,
/// which the fault handler must deal with itself.
pub fn redirect_user_access_fault(frame: &mut IntrFrame) -> bool {
    if frame.error_code & PF_USER != 0 {
        return false;
    }
    frame.eip = frame.eax;
    frame.eax = u32::MAX;
    true
}
