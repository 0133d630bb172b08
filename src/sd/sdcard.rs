//! 设备抽象层: 调用者只以 "缓冲区 + 块号" 的方式说话,
//! 这一层负责参数校验, 块数换算, 以及把驱动层的失败映射成统一的布尔结果,
//! 将介质原生协议(命令序列, 总线初始化, CRC)完全挡在 SdDriver 边界之下.
//!
//! SdCard 自身不持有任何硬件状态:
//! 在位状态每次调用时现查(介质随时可能被拔出), 电源状态由驱动持有,
//! 这一层只做转发并报告驱动给出的成功标志.
//! 因此 SdCard 实例可以任意创建和销毁, 销毁不会断电也不会刷写介质.

use std::sync::Arc;

use lazy_static::*;
use log::error;
use spin::Mutex; // https://docs.rs/spin/0.9.4/spin/struct.Mutex.html

use super::{SdDriver, BLOCK_SIZE};

// 物理资源天然是全局单例: 一条总线, 一个卡槽.
// 核心代码不直接摸全局变量, 而是经由下面两个受锁保护的入口访问它.

lazy_static! {
    /// 构建配置期选定的驱动后端, 进程启动时安装一次.
    /// 之后每个 SdCard::new() 都绑定到同一个驱动, 寻址同一张卡.
    static ref DRIVER: Mutex<Option<Arc<dyn SdDriver>>> = Mutex::new(None);

    /// 总线锁: 在整个驱动调用期间持有,
    /// 保证多个 SdCard 实例并发使用时, 两次传输不会在字节级交错.
    /// 至于 power(false) 与一次在途读写之间的先后顺序, 仍由调用者自行串行化.
    static ref BUS: Mutex<()> = Mutex::new(());
}

/// 安装全局驱动后端. 由选定具体后端的那一侧(构建配置/宿主胶水)调用.
pub fn install_driver(driver: Arc<dyn SdDriver>) {
    *DRIVER.lock() = Some(driver);
}

/// SD 卡的块设备句柄.
/// 除了驱动引用之外没有任何字段: 实例之间除身份外不可区分,
/// 多个实例同时存在时寻址的是同一张卡.
pub struct SdCard {
    driver: Arc<dyn SdDriver>,
}

impl SdCard {
    /// 创建一个绑定到全局已安装驱动的句柄, 无需任何配置参数.
    ///
    /// # Panics
    /// 若尚未通过 [`install_driver`] 安装驱动则 panic:
    /// 后端选定是构建期决策, 缺失属于装配错误而非运行时故障.
    pub fn new() -> Self {
        let driver = DRIVER
            .lock()
            .as_ref()
            .map(Arc::clone)
            .expect("no sdcard driver installed");
        Self { driver }
    }

    /// 直接绑定到指定驱动, 供测试和嵌入方使用.
    pub fn with_driver(driver: Arc<dyn SdDriver>) -> Self {
        Self { driver }
    }

    /// 介质当前是否物理在位. 无副作用, 从不失败: 不在位是正常的 false, 不是错误.
    pub fn present(&self) -> bool {
        let _bus = BUS.lock();
        self.driver.is_present()
    }

    /// 请求电源轨上电(true)或断电(false), 返回驱动报告的成功标志.
    /// 纯转发: 介质不在位时上电是否有意义, 由驱动判断, 这一层不预检.
    pub fn power(&self, on: bool) -> bool {
        let _bus = BUS.lock();
        if on {
            self.driver.power_on()
        } else {
            self.driver.power_off()
        }
    }

    /// 介质总可寻址字节数.
    /// 未上电/不在位时的结果由驱动定义(与驱动行为保持对称, 这一层不预检).
    pub fn capacity(&self) -> u64 {
        let _bus = BUS.lock();
        self.driver.capacity_in_bytes()
    }

    /// 固定的传输粒度, 进程生命周期内不变.
    pub const fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    /// 从 start_block 开始读 buf.len() / BLOCK_SIZE 个块到 buf.
    ///
    /// 块数按整数除法换算: 末尾不足一块的部分不参与传输, 其字节保持原样,
    /// 这是文档化的传输数量语义, 不是错误.
    /// 整个传输成功返回 true; 驱动报告任何失败(总线错误, 块号越界, 卡不在位)
    /// 则返回 false, 此时 buf 内容未定义(可能被部分写入).
    pub fn read(&self, start_block: usize, buf: &mut [u8]) -> bool {
        let n_blocks = buf.len() / BLOCK_SIZE;
        let _bus = BUS.lock();
        match self
            .driver
            .read_blocks(&mut buf[..n_blocks * BLOCK_SIZE], start_block, n_blocks)
        {
            Ok(()) => true,
            Err(e) => {
                error!("read {} blocks at {} failed: {:?}", n_blocks, start_block, e);
                false
            }
        }
    }

    /// 与 read 对称: 将 buf 的前 buf.len() / BLOCK_SIZE 个块写入介质.
    /// 失败时受影响块的介质内容未定义, 这一层不做回滚.
    pub fn write(&self, start_block: usize, buf: &[u8]) -> bool {
        let n_blocks = buf.len() / BLOCK_SIZE;
        let _bus = BUS.lock();
        match self
            .driver
            .write_blocks(&buf[..n_blocks * BLOCK_SIZE], start_block, n_blocks)
        {
            Ok(()) => true,
            Err(e) => {
                error!("write {} blocks at {} failed: {:?}", n_blocks, start_block, e);
                false
            }
        }
    }
}
