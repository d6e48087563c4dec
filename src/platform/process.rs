//! OS process handle backed by sysinfo.
//!
//! sysinfo covers identity, status, CPU, memory and the process table.
//! Counters, threads and sockets it does not expose come from the platform:
//! procfs on Linux, Win32 on Windows.

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::core::profiler::{
    Connection, IoCounters, ProcessHandle, ProcessRef, ProcessStatus, RawPriority, SocketKind,
    ThreadStat,
};
use crate::error::{ProcwatchError, Result};

pub struct SysinfoProcessHandle {
    pid: Pid,
    system: System,
    /// Start time seen at open; a different value means the pid was reused.
    start_time: u64,
    total_memory: u64,
    gone: bool,
}

impl SysinfoProcessHandle {
    /// Open a handle for a live process.
    pub fn open(pid: u32) -> Result<Self> {
        let sys_pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_exe(UpdateKind::OnlyIfNotSet),
        );

        let start_time = system
            .process(sys_pid)
            .map(|process| process.start_time())
            .ok_or(ProcwatchError::ProcessGone { pid })?;

        log::debug!("Opened handle for process {} (start time {})", pid, start_time);

        Ok(Self {
            pid: sys_pid,
            total_memory: system.total_memory(),
            system,
            start_time,
            gone: false,
        })
    }

    fn raw_pid(&self) -> u32 {
        self.pid.as_u32()
    }

    fn gone_error(&self) -> ProcwatchError {
        ProcwatchError::ProcessGone {
            pid: self.raw_pid(),
        }
    }

    /// Remember `ProcessGone` so the handle never resolves again.
    fn record(&mut self, err: ProcwatchError) -> ProcwatchError {
        if matches!(err, ProcwatchError::ProcessGone { .. }) {
            self.gone = true;
        }
        err
    }

    /// Refresh the target and check it is still the process we opened.
    fn refresh(&mut self, kind: ProcessRefreshKind) -> Result<()> {
        if self.gone {
            return Err(self.gone_error());
        }

        self.system
            .refresh_processes_specifics(ProcessesToUpdate::Some(&[self.pid]), true, kind);

        let alive = self
            .system
            .process(self.pid)
            .map(|process| {
                process.start_time() == self.start_time
                    && process.status() != sysinfo::ProcessStatus::Dead
            })
            .unwrap_or(false);

        if !alive {
            log::debug!("Process {} no longer resolves", self.pid);
            self.gone = true;
            return Err(self.gone_error());
        }
        Ok(())
    }

    fn process(&self) -> Result<&sysinfo::Process> {
        self.system
            .process(self.pid)
            .ok_or_else(|| self.gone_error())
    }

    fn to_ref(process: &sysinfo::Process) -> ProcessRef {
        ProcessRef::new(
            process.pid().as_u32(),
            process.parent().map(|p| p.as_u32()),
            process.name().to_string_lossy().to_string(),
        )
    }
}

impl ProcessHandle for SysinfoProcessHandle {
    fn pid(&self) -> u32 {
        self.raw_pid()
    }

    fn name(&mut self) -> Result<String> {
        self.refresh(ProcessRefreshKind::nothing())?;
        Ok(self.process()?.name().to_string_lossy().to_string())
    }

    fn exe_path(&mut self) -> Result<Option<String>> {
        self.refresh(ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet))?;
        Ok(self
            .process()?
            .exe()
            .map(|path| path.to_string_lossy().to_string()))
    }

    fn status(&mut self) -> Result<ProcessStatus> {
        self.refresh(ProcessRefreshKind::nothing())?;
        Ok(map_status(self.process()?.status()))
    }

    fn cpu_percent(&mut self) -> Result<f32> {
        self.refresh(ProcessRefreshKind::nothing().with_cpu())?;
        Ok(self.process()?.cpu_usage().max(0.0))
    }

    fn memory_percent(&mut self) -> Result<f32> {
        self.refresh(ProcessRefreshKind::nothing().with_memory())?;
        let memory = self.process()?.memory();
        if self.total_memory == 0 {
            return Ok(0.0);
        }
        Ok((memory as f64 / self.total_memory as f64 * 100.0) as f32)
    }

    fn io_counters(&mut self) -> Result<IoCounters> {
        self.refresh(ProcessRefreshKind::nothing().with_disk_usage())?;
        let pid = self.raw_pid();
        let result = native::io_counters(pid).map(|native| {
            native.unwrap_or_else(|| {
                // Platform without native counters: bytes only, from sysinfo.
                let usage = self
                    .system
                    .process(self.pid)
                    .map(|p| p.disk_usage())
                    .unwrap_or_default();
                IoCounters {
                    read_bytes: usage.total_read_bytes,
                    write_bytes: usage.total_written_bytes,
                    ..Default::default()
                }
            })
        });
        result.map_err(|err| self.record(err))
    }

    fn threads(&mut self) -> Result<Vec<ThreadStat>> {
        self.refresh(ProcessRefreshKind::nothing())?;
        native::threads(self.raw_pid()).map_err(|err| self.record(err))
    }

    fn niceness(&mut self) -> Result<RawPriority> {
        self.refresh(ProcessRefreshKind::nothing())?;
        native::niceness(self.raw_pid()).map_err(|err| self.record(err))
    }

    fn connections(&mut self) -> Result<Vec<Connection>> {
        self.refresh(ProcessRefreshKind::nothing())?;
        let mut connections =
            native::connections(self.raw_pid()).map_err(|err| self.record(err))?;
        connections.sort_by(|a, b| (a.kind, a.local_addr).cmp(&(b.kind, b.local_addr)));
        Ok(connections)
    }

    fn parent(&mut self) -> Result<Option<ProcessRef>> {
        self.refresh(ProcessRefreshKind::nothing())?;
        let Some(parent_pid) = self.process()?.parent() else {
            return Ok(None);
        };

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[parent_pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        Ok(self.system.process(parent_pid).map(Self::to_ref))
    }

    fn children(&mut self, recursive: bool) -> Result<Vec<ProcessRef>> {
        self.refresh(ProcessRefreshKind::nothing())?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );

        let mut by_parent: std::collections::HashMap<Pid, Vec<&sysinfo::Process>> =
            std::collections::HashMap::new();
        for process in self.system.processes().values() {
            // Threads show up as processes on Linux; skip them.
            if process.thread_kind().is_some() {
                continue;
            }
            if let Some(parent) = process.parent() {
                by_parent.entry(parent).or_default().push(process);
            }
        }

        let mut result = Vec::new();
        let mut frontier = vec![self.pid];
        while let Some(current) = frontier.pop() {
            let Some(children) = by_parent.get(&current) else {
                continue;
            };
            for child in children {
                result.push(Self::to_ref(child));
                if recursive {
                    frontier.push(child.pid());
                }
            }
        }
        result.sort_by_key(|p| p.pid);
        Ok(result)
    }

    fn terminate(&mut self) -> Result<()> {
        if self.refresh(ProcessRefreshKind::nothing()).is_err() {
            // Already gone
            return Ok(());
        }
        let process = self.process()?;
        let delivered = process
            .kill_with(sysinfo::Signal::Term)
            .unwrap_or_else(|| process.kill());
        if delivered {
            log::info!("Sent termination request to process {}", self.pid);
            Ok(())
        } else {
            Err(ProcwatchError::access_denied(
                self.raw_pid(),
                "termination signal was rejected",
            ))
        }
    }
}

fn map_status(status: sysinfo::ProcessStatus) -> ProcessStatus {
    use sysinfo::ProcessStatus as Sys;
    match status {
        Sys::Run => ProcessStatus::Running,
        Sys::Sleep => ProcessStatus::Sleeping,
        Sys::UninterruptibleDiskSleep => ProcessStatus::DiskSleep,
        Sys::Idle => ProcessStatus::Idle,
        Sys::Stop => ProcessStatus::Stopped,
        Sys::Tracing => ProcessStatus::Tracing,
        Sys::Zombie => ProcessStatus::Zombie,
        Sys::Dead => ProcessStatus::Dead,
        Sys::Waking | Sys::Wakekill => ProcessStatus::Waking,
        Sys::Parked => ProcessStatus::Parked,
        Sys::LockBlocked => ProcessStatus::Locked,
        _ => ProcessStatus::Unknown,
    }
}

#[cfg(target_os = "linux")]
mod native {
    use std::collections::HashSet;

    use procfs::net::TcpState;
    use procfs::process::{FDTarget, Process};
    use procfs::ProcError;

    use super::{Connection, IoCounters, RawPriority, SocketKind, ThreadStat};
    use crate::error::{ProcwatchError, Result};

    fn map_error(pid: u32, err: ProcError) -> ProcwatchError {
        match err {
            ProcError::NotFound(_) => ProcwatchError::ProcessGone { pid },
            ProcError::PermissionDenied(path) => {
                ProcwatchError::access_denied(pid, format!("cannot read {:?}", path))
            }
            ProcError::Io(io, _) if io.raw_os_error() == Some(libc::ESRCH) => {
                ProcwatchError::ProcessGone { pid }
            }
            other => ProcwatchError::other(format!(
                "procfs query for process {} failed: {}",
                pid, other
            )),
        }
    }

    fn open(pid: u32) -> Result<Process> {
        Process::new(pid as i32).map_err(|e| map_error(pid, e))
    }

    fn clock_ticks() -> f64 {
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if ticks > 0 {
            ticks as f64
        } else {
            100.0
        }
    }

    pub fn io_counters(pid: u32) -> Result<Option<IoCounters>> {
        let io = open(pid)?.io().map_err(|e| map_error(pid, e))?;
        Ok(Some(IoCounters {
            read_count: io.syscr,
            write_count: io.syscw,
            other_count: 0,
            read_bytes: io.read_bytes,
            write_bytes: io.write_bytes,
            other_bytes: 0,
        }))
    }

    pub fn threads(pid: u32) -> Result<Vec<ThreadStat>> {
        let ticks = clock_ticks();
        let tasks = open(pid)?.tasks().map_err(|e| map_error(pid, e))?;

        let mut threads = Vec::new();
        // A thread that exits while we walk the list is skipped.
        for task in tasks.flatten() {
            let Ok(stat) = task.stat() else {
                continue;
            };
            threads.push(ThreadStat {
                thread_id: task.tid as u64,
                user_time: stat.utime as f64 / ticks,
                system_time: stat.stime as f64 / ticks,
            });
        }
        Ok(threads)
    }

    pub fn niceness(pid: u32) -> Result<RawPriority> {
        let stat = open(pid)?.stat().map_err(|e| map_error(pid, e))?;
        Ok(RawPriority::Nice(stat.nice as i32))
    }

    fn tcp_state(state: &TcpState) -> &'static str {
        match state {
            TcpState::Established => "ESTABLISHED",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynRecv | TcpState::NewSynRecv => "SYN_RECV",
            TcpState::FinWait1 => "FIN_WAIT1",
            TcpState::FinWait2 => "FIN_WAIT2",
            TcpState::TimeWait => "TIME_WAIT",
            TcpState::Close => "CLOSE",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::LastAck => "LAST_ACK",
            TcpState::Listen => "LISTEN",
            TcpState::Closing => "CLOSING",
        }
    }

    /// Socket inodes from `/proc/<pid>/fd` joined with the socket tables of
    /// the process's network namespace.
    pub fn connections(pid: u32) -> Result<Vec<Connection>> {
        let process = open(pid)?;
        let inodes: HashSet<u64> = process
            .fd()
            .map_err(|e| map_error(pid, e))?
            .flatten()
            .filter_map(|fd| match fd.target {
                FDTarget::Socket(inode) => Some(inode),
                _ => None,
            })
            .collect();
        if inodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut connections = Vec::new();
        // A missing table (no IPv6 support) just contributes nothing.
        for (kind, table) in [
            (SocketKind::Tcp, process.tcp()),
            (SocketKind::Tcp6, process.tcp6()),
        ] {
            for entry in table.unwrap_or_default() {
                if inodes.contains(&entry.inode) {
                    connections.push(Connection::new(
                        kind,
                        entry.local_address,
                        entry.remote_address,
                        tcp_state(&entry.state),
                    ));
                }
            }
        }
        for (kind, table) in [
            (SocketKind::Udp, process.udp()),
            (SocketKind::Udp6, process.udp6()),
        ] {
            for entry in table.unwrap_or_default() {
                if inodes.contains(&entry.inode) {
                    connections.push(Connection::new(
                        kind,
                        entry.local_address,
                        entry.remote_address,
                        "NONE",
                    ));
                }
            }
        }
        Ok(connections)
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
mod native {
    use super::{Connection, IoCounters, RawPriority, ThreadStat};
    use crate::error::{ProcwatchError, Result};

    pub fn io_counters(_pid: u32) -> Result<Option<IoCounters>> {
        Ok(None)
    }

    pub fn threads(_pid: u32) -> Result<Vec<ThreadStat>> {
        Ok(Vec::new())
    }

    pub fn connections(_pid: u32) -> Result<Vec<Connection>> {
        Ok(Vec::new())
    }

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    fn clear_errno() {
        unsafe { *libc::__error() = 0 };
    }

    #[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
    fn clear_errno() {}

    pub fn niceness(pid: u32) -> Result<RawPriority> {
        clear_errno();
        // -1 is a valid niceness, errno tells the difference
        let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) };
        if nice == -1 {
            match std::io::Error::last_os_error().raw_os_error() {
                Some(libc::ESRCH) => return Err(ProcwatchError::ProcessGone { pid }),
                Some(libc::EPERM) | Some(libc::EACCES) => {
                    return Err(ProcwatchError::access_denied(pid, "getpriority"))
                }
                _ => {}
            }
        }
        Ok(RawPriority::Nice(nice))
    }
}

#[cfg(windows)]
mod native {
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

    use windows_sys::Win32::Foundation::{
        CloseHandle, GetLastError, ERROR_ACCESS_DENIED, ERROR_INSUFFICIENT_BUFFER, FILETIME,
        HANDLE, INVALID_HANDLE_VALUE, NO_ERROR,
    };
    use windows_sys::Win32::NetworkManagement::IpHelper::{
        GetExtendedTcpTable, GetExtendedUdpTable, MIB_TCPROW_OWNER_PID, MIB_TCPTABLE_OWNER_PID,
        MIB_UDPROW_OWNER_PID, MIB_UDPTABLE_OWNER_PID, TCP_TABLE_OWNER_PID_ALL,
        UDP_TABLE_OWNER_PID,
    };
    use windows_sys::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, Thread32First, Thread32Next, TH32CS_SNAPTHREAD, THREADENTRY32,
    };
    use windows_sys::Win32::System::Threading::{
        GetPriorityClass, GetProcessIoCounters, GetThreadTimes, OpenProcess, OpenThread,
        IO_COUNTERS, PROCESS_QUERY_LIMITED_INFORMATION, THREAD_QUERY_LIMITED_INFORMATION,
    };

    use super::{Connection, IoCounters, RawPriority, SocketKind, ThreadStat};
    use crate::error::{ProcwatchError, Result};

    const AF_INET: u32 = 2;
    /// FILETIME ticks per second (100ns units).
    const FILETIME_TICKS: f64 = 10_000_000.0;

    /// Kernel handle closed on drop.
    struct OwnedHandle(HANDLE);

    impl Drop for OwnedHandle {
        fn drop(&mut self) {
            unsafe {
                CloseHandle(self.0);
            }
        }
    }

    fn open(pid: u32) -> Result<OwnedHandle> {
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
        if handle.is_null() {
            let code = unsafe { GetLastError() };
            return Err(if code == ERROR_ACCESS_DENIED {
                ProcwatchError::access_denied(pid, "OpenProcess")
            } else {
                ProcwatchError::ProcessGone { pid }
            });
        }
        Ok(OwnedHandle(handle))
    }

    pub fn io_counters(pid: u32) -> Result<Option<IoCounters>> {
        let handle = open(pid)?;
        let mut counters: IO_COUNTERS = unsafe { std::mem::zeroed() };
        let ok = unsafe { GetProcessIoCounters(handle.0, &mut counters) };
        if ok == 0 {
            return Err(ProcwatchError::ProcessGone { pid });
        }
        Ok(Some(IoCounters {
            read_count: counters.ReadOperationCount,
            write_count: counters.WriteOperationCount,
            other_count: counters.OtherOperationCount,
            read_bytes: counters.ReadTransferCount,
            write_bytes: counters.WriteTransferCount,
            other_bytes: counters.OtherTransferCount,
        }))
    }

    fn filetime_secs(time: &FILETIME) -> f64 {
        let ticks = ((time.dwHighDateTime as u64) << 32) | time.dwLowDateTime as u64;
        ticks as f64 / FILETIME_TICKS
    }

    /// User and kernel time of one thread; `None` if it exited or is closed to us.
    fn thread_times(tid: u32) -> Option<ThreadStat> {
        let handle = unsafe { OpenThread(THREAD_QUERY_LIMITED_INFORMATION, 0, tid) };
        if handle.is_null() {
            return None;
        }
        let handle = OwnedHandle(handle);

        let mut creation: FILETIME = unsafe { std::mem::zeroed() };
        let mut exit: FILETIME = unsafe { std::mem::zeroed() };
        let mut kernel: FILETIME = unsafe { std::mem::zeroed() };
        let mut user: FILETIME = unsafe { std::mem::zeroed() };
        let ok = unsafe {
            GetThreadTimes(handle.0, &mut creation, &mut exit, &mut kernel, &mut user)
        };
        if ok == 0 {
            return None;
        }
        Some(ThreadStat {
            thread_id: tid as u64,
            user_time: filetime_secs(&user),
            system_time: filetime_secs(&kernel),
        })
    }

    /// Walk the system thread snapshot and keep the threads owned by `pid`.
    pub fn threads(pid: u32) -> Result<Vec<ThreadStat>> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0) };
        if snapshot == INVALID_HANDLE_VALUE {
            return Err(ProcwatchError::other(format!(
                "thread snapshot for process {} failed (error {})",
                pid,
                unsafe { GetLastError() }
            )));
        }
        let snapshot = OwnedHandle(snapshot);

        let mut entry: THREADENTRY32 = unsafe { std::mem::zeroed() };
        entry.dwSize = std::mem::size_of::<THREADENTRY32>() as u32;

        let mut threads = Vec::new();
        let mut more = unsafe { Thread32First(snapshot.0, &mut entry) } != 0;
        while more {
            if entry.th32OwnerProcessID == pid {
                if let Some(stat) = thread_times(entry.th32ThreadID) {
                    threads.push(stat);
                }
            }
            more = unsafe { Thread32Next(snapshot.0, &mut entry) } != 0;
        }
        Ok(threads)
    }

    pub fn niceness(pid: u32) -> Result<RawPriority> {
        let handle = open(pid)?;
        let class = unsafe { GetPriorityClass(handle.0) };
        if class == 0 {
            return Err(ProcwatchError::ProcessGone { pid });
        }
        Ok(RawPriority::Class(class))
    }

    fn tcp_state(state: u32) -> &'static str {
        match state {
            1 => "CLOSE",
            2 => "LISTEN",
            3 => "SYN_SENT",
            4 => "SYN_RECV",
            5 => "ESTABLISHED",
            6 => "FIN_WAIT1",
            7 => "FIN_WAIT2",
            8 => "CLOSE_WAIT",
            9 => "CLOSING",
            10 => "LAST_ACK",
            11 => "TIME_WAIT",
            12 => "DELETE_TCB",
            _ => "NONE",
        }
    }

    fn ipv4(addr: u32, port: u32) -> SocketAddr {
        // Both are stored in network byte order
        SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::from(addr.to_ne_bytes()),
            u16::from_be(port as u16),
        ))
    }

    /// Fill a buffer with an IP helper table, growing it while the table
    /// grows between the size query and the read.
    fn read_table(
        pid: u32,
        fetch: impl Fn(*mut core::ffi::c_void, *mut u32) -> u32,
    ) -> Result<Vec<u64>> {
        let mut size: u32 = 0;
        let mut buffer: Vec<u64> = Vec::new();
        for _ in 0..4 {
            let code = fetch(buffer.as_mut_ptr().cast(), &mut size as *mut u32);
            if code == NO_ERROR {
                return Ok(buffer);
            }
            if code != ERROR_INSUFFICIENT_BUFFER {
                return Err(ProcwatchError::other(format!(
                    "socket table for process {} failed (error {})",
                    pid, code
                )));
            }
            buffer = vec![0u64; (size as usize).div_ceil(8)];
        }
        Err(ProcwatchError::other(format!(
            "socket table for process {} kept growing",
            pid
        )))
    }

    /// IPv4 TCP and UDP sockets owned by `pid`.
    pub fn connections(pid: u32) -> Result<Vec<Connection>> {
        let mut connections = Vec::new();

        let tcp = read_table(pid, |table, size| unsafe {
            GetExtendedTcpTable(table, size, 0, AF_INET, TCP_TABLE_OWNER_PID_ALL, 0)
        })?;
        if !tcp.is_empty() {
            let table = tcp.as_ptr().cast::<MIB_TCPTABLE_OWNER_PID>();
            let rows: &[MIB_TCPROW_OWNER_PID] = unsafe {
                std::slice::from_raw_parts((*table).table.as_ptr(), (*table).dwNumEntries as usize)
            };
            for row in rows.iter().filter(|row| row.dwOwningPid == pid) {
                connections.push(Connection::new(
                    SocketKind::Tcp,
                    ipv4(row.dwLocalAddr, row.dwLocalPort),
                    ipv4(row.dwRemoteAddr, row.dwRemotePort),
                    tcp_state(row.dwState),
                ));
            }
        }

        let udp = read_table(pid, |table, size| unsafe {
            GetExtendedUdpTable(table, size, 0, AF_INET, UDP_TABLE_OWNER_PID, 0)
        })?;
        if !udp.is_empty() {
            let table = udp.as_ptr().cast::<MIB_UDPTABLE_OWNER_PID>();
            let rows: &[MIB_UDPROW_OWNER_PID] = unsafe {
                std::slice::from_raw_parts((*table).table.as_ptr(), (*table).dwNumEntries as usize)
            };
            for row in rows.iter().filter(|row| row.dwOwningPid == pid) {
                connections.push(Connection::new(
                    SocketKind::Udp,
                    ipv4(row.dwLocalAddr, row.dwLocalPort),
                    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
                    "NONE",
                ));
            }
        }

        Ok(connections)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_current_process() {
        let pid = std::process::id();
        let mut handle = SysinfoProcessHandle::open(pid).unwrap();

        assert_eq!(handle.pid(), pid);
        assert!(!handle.name().unwrap().is_empty());
        assert!(handle.memory_percent().unwrap() >= 0.0);
        assert!(handle.cpu_percent().unwrap() >= 0.0);
        assert!(handle.niceness().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_process_threads_and_io() {
        let mut handle = SysinfoProcessHandle::open(std::process::id()).unwrap();
        let threads = handle.threads().unwrap();
        assert!(!threads.is_empty());
        assert!(threads.iter().all(|t| t.user_time >= 0.0 && t.system_time >= 0.0));

        let first = handle.io_counters().unwrap();
        let second = handle.io_counters().unwrap();
        assert!(second.is_monotonic_from(&first));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_process_listening_socket() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut handle = SysinfoProcessHandle::open(std::process::id()).unwrap();
        let connections = handle.connections().unwrap();
        let listening = connections
            .iter()
            .find(|c| c.local_addr.port() == port)
            .expect("listener is reported");
        assert_eq!(listening.kind, SocketKind::Tcp);
        assert_eq!(listening.state, "LISTEN");
        assert_eq!(listening.remote_addr, None);
    }

    #[test]
    fn test_open_missing_pid_is_gone() {
        // pid near the top of the range is essentially never in use
        let result = SysinfoProcessHandle::open(u32::MAX - 7);
        assert!(matches!(result, Err(ProcwatchError::ProcessGone { .. })));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status(sysinfo::ProcessStatus::Run), ProcessStatus::Running);
        assert_eq!(map_status(sysinfo::ProcessStatus::Zombie), ProcessStatus::Zombie);
        assert_eq!(
            map_status(sysinfo::ProcessStatus::Unknown(99)),
            ProcessStatus::Unknown
        );
    }
}
