use crate::sd::{SdDriver, SdError, BLOCK_SIZE};
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
    sync::Mutex,
};

// std::fs::File 由 Rust 标准库 std 提供，可以访问宿主机上的一个文件。
// 我们用一个固定大小的文件来模拟一张 SD 卡，为它实现 SdDriver 接口。
// 注意 File 本身仅通过 read/write 接口是不能实现随机读写的，
// 在访问一个特定的块的时候，我们必须先 seek 到这个块的开头位置。
//
// 真实硬件上驱动还持有卡检测线和电源轨两个物理状态, 这里给出对应物:
// inserted 模拟卡检测线(测试可以随时"拔卡"), 打开的文件句柄则扮演电源轨 ——
// power_on 打开镜像文件, power_off 丢弃句柄.

pub struct FileCard {
    path: PathBuf,
    /// 介质总字节数, BLOCK_SIZE 的整数倍
    capacity: u64,
    /// 卡检测线
    inserted: AtomicBool,
    /// Some 即上电
    file: Mutex<Option<File>>,
}

impl FileCard {
    /// 建立一张容量为 num_blocks 个块的模拟卡, 初始在位且未上电.
    /// 镜像文件在 power_on 时才会被创建/打开.
    pub fn new(path: impl Into<PathBuf>, num_blocks: usize) -> Self {
        Self {
            path: path.into(),
            capacity: (num_blocks * BLOCK_SIZE) as u64,
            inserted: AtomicBool::new(true),
            file: Mutex::new(None),
        }
    }

    /// 模拟拔卡. 已上电时电源轨同时掉电(句柄被丢弃).
    pub fn eject(&self) {
        self.inserted.store(false, Ordering::SeqCst);
        self.file.lock().unwrap().take();
    }

    /// 模拟插卡
    pub fn insert(&self) {
        self.inserted.store(true, Ordering::SeqCst);
    }

    /// 传输前的公共检查: 在位, 已上电, 块区间不越界
    fn check_range(&self, start_block: usize, n_blocks: usize) -> Result<(), SdError> {
        if !self.inserted.load(Ordering::SeqCst) {
            return Err(SdError::NoMedium);
        }
        if self.file.lock().unwrap().is_none() {
            return Err(SdError::NotPowered);
        }
        let end = (start_block + n_blocks) as u64 * BLOCK_SIZE as u64;
        if end > self.capacity {
            return Err(SdError::OutOfRange);
        }
        Ok(())
    }
}

impl SdDriver for FileCard {
    fn is_present(&self) -> bool {
        self.inserted.load(Ordering::SeqCst)
    }

    /// 上电: 打开(必要时创建)镜像文件并将其设置为整卡大小.
    /// 已上电时重复上电直接成功; 卡不在位或文件打不开则失败.
    fn power_on(&self) -> bool {
        if !self.inserted.load(Ordering::SeqCst) {
            return false;
        }
        let mut file = self.file.lock().unwrap();
        if file.is_some() {
            return true;
        }
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .and_then(|f| f.set_len(self.capacity).map(|_| f));
        match opened {
            Ok(f) => {
                *file = Some(f);
                true
            }
            Err(_) => false,
        }
    }

    /// 断电: 丢弃文件句柄. 总能成功, 重复断电也一样.
    fn power_off(&self) -> bool {
        self.file.lock().unwrap().take();
        true
    }

    /// 上电后报告配置的容量, 未上电时报告 0.
    /// (真实驱动在上电时才从卡的 CSD 寄存器读出容量, 这里保持同样的形状.)
    fn capacity_in_bytes(&self) -> u64 {
        if self.file.lock().unwrap().is_some() {
            self.capacity
        } else {
            0
        }
    }

    /// 读取 n_blocks 个块从镜像文件
    fn read_blocks(
        &self,
        buf: &mut [u8],
        start_block: usize,
        n_blocks: usize,
    ) -> Result<(), SdError> {
        self.check_range(start_block, n_blocks)?;
        let mut file = self.file.lock().unwrap();
        let file = file.as_mut().ok_or(SdError::NotPowered)?;
        file.seek(SeekFrom::Start((start_block * BLOCK_SIZE) as u64))
            .map_err(|_| SdError::Transfer)?;
        file.read_exact(buf).map_err(|_| SdError::Transfer)
    }

    /// 写入 n_blocks 个块到镜像文件
    fn write_blocks(&self, buf: &[u8], start_block: usize, n_blocks: usize) -> Result<(), SdError> {
        self.check_range(start_block, n_blocks)?;
        let mut file = self.file.lock().unwrap();
        let file = file.as_mut().ok_or(SdError::NotPowered)?;
        file.seek(SeekFrom::Start((start_block * BLOCK_SIZE) as u64))
            .map_err(|_| SdError::Transfer)?;
        file.write_all(buf).map_err(|_| SdError::Transfer)
    }
}
