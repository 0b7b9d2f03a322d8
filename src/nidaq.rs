use anyhow::{anyhow, Context, Result};
use libloading::Library;
use once_cell::sync::OnceCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_double, c_int, c_uint, c_ulonglong, c_void};

use crate::config::LoggerConfig;
use crate::drivers::{LoggerError, SampleSource};

type TaskHandle = *mut c_void;

// Attribute values from the NI-DAQmx ANSI C header.
const DAQMX_VAL_DIFF: c_int = 10106;
const DAQMX_VAL_VOLTS: c_int = 10348;
const DAQMX_VAL_RISING: c_int = 10280;
const DAQMX_VAL_CONT_SAMPS: c_int = 10123;
const DAQMX_VAL_GROUP_BY_CHANNEL: c_uint = 0;

const ERROR_BUFFER_LEN: usize = 2048;

#[cfg(windows)]
const DAQMX_LIBRARY: &str = "nicaiu.dll";
#[cfg(not(windows))]
const DAQMX_LIBRARY: &str = "libnidaqmx.so";

struct NidaqApi {
    #[allow(dead_code)]
    lib: Library,
    create_task: unsafe extern "C" fn(*const c_char, *mut TaskHandle) -> c_int,
    create_ai_voltage_chan: unsafe extern "C" fn(
        TaskHandle,
        *const c_char,
        *const c_char,
        c_int,
        c_double,
        c_double,
        c_int,
        *const c_char,
    ) -> c_int,
    cfg_samp_clk_timing: unsafe extern "C" fn(
        TaskHandle,
        *const c_char,
        c_double,
        c_int,
        c_int,
        c_ulonglong,
    ) -> c_int,
    start_task: unsafe extern "C" fn(TaskHandle) -> c_int,
    read_analog_f64: unsafe extern "C" fn(
        TaskHandle,
        c_int,
        c_double,
        c_uint,
        *mut c_double,
        c_uint,
        *mut c_int,
        *mut c_uint,
    ) -> c_int,
    stop_task: unsafe extern "C" fn(TaskHandle) -> c_int,
    clear_task: unsafe extern "C" fn(TaskHandle) -> c_int,
    get_extended_error_info: unsafe extern "C" fn(*mut c_char, c_uint) -> c_int,
}

impl NidaqApi {
    fn load() -> Result<Self> {
        // The runtime ships the DLL system-wide; no bundled copy needed.
        let lib = unsafe { Library::new(DAQMX_LIBRARY) }
            .with_context(|| format!("{DAQMX_LIBRARY} not found; is the NI-DAQmx runtime installed?"))?;
        // Safety: we assume the DAQmx ANSI C API signatures from the official header.
        unsafe {
            Ok(Self {
                create_task: *lib.get(b"DAQmxCreateTask\0")?,
                create_ai_voltage_chan: *lib.get(b"DAQmxCreateAIVoltageChan\0")?,
                cfg_samp_clk_timing: *lib.get(b"DAQmxCfgSampClkTiming\0")?,
                start_task: *lib.get(b"DAQmxStartTask\0")?,
                read_analog_f64: *lib.get(b"DAQmxReadAnalogF64\0")?,
                stop_task: *lib.get(b"DAQmxStopTask\0")?,
                clear_task: *lib.get(b"DAQmxClearTask\0")?,
                get_extended_error_info: *lib.get(b"DAQmxGetExtendedErrorInfo\0")?,
                lib,
            })
        }
    }

    fn instance() -> Result<&'static NidaqApi> {
        static API: OnceCell<NidaqApi> = OnceCell::new();
        API.get_or_try_init(Self::load)
    }

    /// DAQmx convention: negative status is an error, positive is a warning.
    fn check(&self, code: c_int, ctx: &str) -> Result<()> {
        if code >= 0 {
            Ok(())
        } else {
            Err(anyhow!(
                "{ctx} failed (DAQmx status {code}): {}",
                self.extended_error_info()
            ))
        }
    }

    fn extended_error_info(&self) -> String {
        let mut buf = vec![0 as c_char; ERROR_BUFFER_LEN];
        unsafe {
            (self.get_extended_error_info)(buf.as_mut_ptr(), ERROR_BUFFER_LEN as c_uint);
        }
        let bytes: Vec<u8> = buf
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Runs a stop+clear sequence at most once. Both calls are attempted even if
/// stop fails, so the task handle is always released; the first failure wins.
fn release_once(
    released: &mut bool,
    stop: impl FnOnce() -> Result<()>,
    clear: impl FnOnce() -> Result<()>,
) -> Result<()> {
    if *released {
        return Ok(());
    }
    *released = true;
    let stopped = stop();
    let cleared = clear();
    stopped.and(cleared)
}

/// DAQmx-backed acquisition session for one analog input channel.
///
/// Owns the task handle for its whole lifetime: the task is created,
/// configured and started in [`NidaqSession::open`], and stopped and
/// cleared exactly once when the session is dropped, whether or not an
/// error aborted the read loop.
pub struct NidaqSession {
    api: &'static NidaqApi,
    handle: TaskHandle,
    read_timeout_secs: f64,
    released: bool,
}

impl NidaqSession {
    /// Creates the task, configures the AI channel and sample clock, and
    /// starts continuous acquisition.
    pub fn open(config: &LoggerConfig) -> Result<Self> {
        let api = NidaqApi::instance()?;

        let mut handle: TaskHandle = std::ptr::null_mut();
        let empty = CString::new("")?;
        api.check(
            unsafe { (api.create_task)(empty.as_ptr(), &mut handle) },
            "DAQmxCreateTask",
        )?;

        // From here the handle exists; wrap it so a failing configure call
        // still stops and clears the task on drop.
        let mut session = Self {
            api,
            handle,
            read_timeout_secs: config.read_timeout_secs,
            released: false,
        };
        session.configure(config)?;
        Ok(session)
    }

    fn configure(&mut self, config: &LoggerConfig) -> Result<()> {
        let channel = CString::new(config.channel.as_str())
            .context("channel name contains an interior NUL")?;
        let empty = CString::new("")?;
        self.api.check(
            unsafe {
                (self.api.create_ai_voltage_chan)(
                    self.handle,
                    channel.as_ptr(),
                    empty.as_ptr(),
                    DAQMX_VAL_DIFF,
                    config.min_volts,
                    config.max_volts,
                    DAQMX_VAL_VOLTS,
                    std::ptr::null(),
                )
            },
            "DAQmxCreateAIVoltageChan",
        )?;

        let clock_source = CString::new("OnboardClock")?;
        self.api.check(
            unsafe {
                (self.api.cfg_samp_clk_timing)(
                    self.handle,
                    clock_source.as_ptr(),
                    config.frequency_hz,
                    DAQMX_VAL_RISING,
                    DAQMX_VAL_CONT_SAMPS,
                    config.block_size as c_ulonglong,
                )
            },
            "DAQmxCfgSampClkTiming",
        )?;

        self.api
            .check(unsafe { (self.api.start_task)(self.handle) }, "DAQmxStartTask")
    }

    /// Stops and clears the task. Idempotent; also invoked from `Drop`.
    pub fn close(&mut self) -> Result<()> {
        let api = self.api;
        let handle = self.handle;
        release_once(
            &mut self.released,
            || api.check(unsafe { (api.stop_task)(handle) }, "DAQmxStopTask"),
            || api.check(unsafe { (api.clear_task)(handle) }, "DAQmxClearTask"),
        )
    }
}

impl SampleSource for NidaqSession {
    /// Blocks until `out.len()` samples arrive or the timeout elapses; the
    /// driver may hand back fewer samples than requested.
    fn read_block(&mut self, out: &mut [f64]) -> Result<usize, LoggerError> {
        let mut reads: c_int = 0;
        self.api
            .check(
                unsafe {
                    (self.api.read_analog_f64)(
                        self.handle,
                        out.len() as c_int,
                        self.read_timeout_secs,
                        DAQMX_VAL_GROUP_BY_CHANNEL,
                        out.as_mut_ptr(),
                        out.len() as c_uint,
                        &mut reads,
                        std::ptr::null_mut(),
                    )
                },
                "DAQmxReadAnalogF64",
            )
            .map_err(LoggerError::Acquisition)?;
        Ok(reads.max(0) as usize)
    }
}

impl Drop for NidaqSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
