//! 驱动接口层: SD 卡设备抽象层只通过这六个原语与底层驱动交互,
//! 具体的驱动(真实硬件总线, 或是用宿主机文件模拟的卡)需要实现这些方法.
//! 泛用性: 上层的 SdCard 可以挂接任何实现了 SdDriver Trait 的驱动后端.

use std::any::Any;

// 命令组帧, CRC 校验, 总线初始化等介质原生协议全部属于驱动内部,
// 这一层看到的只有 "原语成功或失败".
// 重试策略同样属于驱动: 抽象层收到 Err 后原样上报, 不做任何恢复.

/// 驱动层故障分类.
/// 注意: 这些区别只存在于驱动边界上, SdCard 对外一律坍缩成布尔的失败,
/// 调用者自己决定一次 false 是否致命.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdError {
    /// 卡槽中没有检测到介质
    NoMedium,
    /// 介质在位但电源轨未上电
    NotPowered,
    /// 请求的块区间超出介质容量
    OutOfRange,
    /// 总线传输中途失败, 缓冲区/介质内容可能已被部分写入
    Transfer,
}

// 驱动后端在构建配置期唯一选定, 核心代码从不按后端身份分支.

pub trait SdDriver: Send + Sync + Any {
    // is_present 查询卡检测线, 介质可能在任意两次调用之间被插入或拔出,
    // 所以结果从不缓存;
    fn is_present(&self) -> bool;

    // power_on / power_off 请求驱动对电源轨上电/断电, 返回是否成功;
    // 电源状态由驱动持有, 抽象层不在本地跟踪.
    fn power_on(&self) -> bool;

    fn power_off(&self) -> bool;

    // capacity_in_bytes 报告介质总可寻址字节数;
    // 未上电/不在位时的返回值由驱动自行定义.
    fn capacity_in_bytes(&self) -> u64;

    // read_blocks 将从 start_block 开始的 n_blocks 个块读入缓冲区 buf;
    // buf 的长度恰好为 n_blocks * BLOCK_SIZE.
    fn read_blocks(&self, buf: &mut [u8], start_block: usize, n_blocks: usize)
        -> Result<(), SdError>;

    // write_blocks 将缓冲区 buf 写入从 start_block 开始的 n_blocks 个块.
    fn write_blocks(&self, buf: &[u8], start_block: usize, n_blocks: usize)
        -> Result<(), SdError>;
}
