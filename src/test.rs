#![allow(unused)]
use super::device;
use super::sd;
use device::FileCard;
use sd::{install_driver, SdCard, SdDriver, BLOCK_SIZE};
use std::sync::Arc;

/// 创建一张模拟卡并上电, 返回绑定好的设备句柄和驱动引用
fn powered_card(image: &str, num_blocks: usize) -> (SdCard, Arc<FileCard>) {
    std::fs::create_dir_all("target").unwrap();
    let driver = Arc::new(FileCard::new(format!("target/{}", image), num_blocks));
    let card = SdCard::with_driver(driver.clone());
    assert!(card.power(true));
    (card, driver)
}

#[test]
fn sd_round_trip_test() {
    let (card, _driver) = powered_card("sd-roundtrip.img", 4096);
    assert!(card.present());
    assert_eq!(card.capacity(), (4096 * BLOCK_SIZE) as u64);
    assert_eq!(card.block_size(), BLOCK_SIZE);

    // 具体场景: 在块 10 写入三个块, 再读回比较
    let mut src = vec![0u8; 3 * BLOCK_SIZE];
    for byte in src.iter_mut() {
        *byte = rand::random::<u8>();
    }
    assert!(card.write(10, &src));
    let mut dst = vec![0u8; 3 * BLOCK_SIZE];
    assert!(card.read(10, &mut dst));
    assert_eq!(src, dst);

    // 对齐长度 L 恰好传输 L / BLOCK_SIZE 个块, 用若干块数重复验证
    let round_trip_test = |start: usize, n_blocks: usize| {
        let mut src = vec![0u8; n_blocks * BLOCK_SIZE];
        for byte in src.iter_mut() {
            *byte = rand::random::<u8>();
        }
        assert!(card.write(start, &src));
        let mut dst = vec![0u8; n_blocks * BLOCK_SIZE];
        assert!(card.read(start, &mut dst));
        assert_eq!(src, dst);
    };

    round_trip_test(0, 1);
    round_trip_test(1, 4);
    round_trip_test(100, 8);
    round_trip_test(512, 100);
    round_trip_test(2000, 400);
}

#[test]
fn sd_truncation_test() {
    let (card, _driver) = powered_card("sd-truncation.img", 256);

    // 非对齐长度不报错, 只传输整块部分
    // 先用对齐写把块 20..23 填上已知图样
    let pattern: Vec<u8> = (0..3 * BLOCK_SIZE).map(|i| (i % 251) as u8).collect();
    assert!(card.write(20, &pattern));

    // 读缓冲区长 2.5 块: 只有前两块被覆盖, 末尾的半块字节保持原样
    let mut dst = vec![0xAAu8; 2 * BLOCK_SIZE + BLOCK_SIZE / 2];
    assert!(card.read(20, &mut dst));
    assert_eq!(&dst[..2 * BLOCK_SIZE], &pattern[..2 * BLOCK_SIZE]);
    assert!(dst[2 * BLOCK_SIZE..].iter().all(|&b| b == 0xAA));

    // 写侧对称: 2.5 块的缓冲区只有前两块落到介质上, 第三块不受影响
    let half_src = vec![0x55u8; 2 * BLOCK_SIZE + BLOCK_SIZE / 2];
    assert!(card.write(20, &half_src));
    let mut check = vec![0u8; 3 * BLOCK_SIZE];
    assert!(card.read(20, &mut check));
    assert!(check[..2 * BLOCK_SIZE].iter().all(|&b| b == 0x55));
    assert_eq!(&check[2 * BLOCK_SIZE..], &pattern[2 * BLOCK_SIZE..]);

    // 不足一块的缓冲区: 换算出 0 个块, 同样不是错误
    let mut tiny = vec![0xAAu8; BLOCK_SIZE / 4];
    assert!(card.read(20, &mut tiny));
    assert!(tiny.iter().all(|&b| b == 0xAA));
}

#[test]
fn sd_boundary_test() {
    const NUM_BLOCKS: usize = 128;
    let (card, _driver) = powered_card("sd-boundary.img", NUM_BLOCKS);

    let last = (card.capacity() as usize / BLOCK_SIZE) - 1;
    assert_eq!(last, NUM_BLOCKS - 1);

    let mut buf = vec![0u8; BLOCK_SIZE];
    // 首块与末块都可读写
    assert!(card.write(0, &buf));
    assert!(card.read(0, &mut buf));
    assert!(card.write(last, &buf));
    assert!(card.read(last, &mut buf));
    // 越过末块一格: 驱动报告失败, 调用返回 false
    assert!(!card.read(last + 1, &mut buf));
    assert!(!card.write(last + 1, &buf));
    // 跨越末端的多块传输同样失败
    let mut two = vec![0u8; 2 * BLOCK_SIZE];
    assert!(!card.read(last, &mut two));
}

#[test]
fn sd_power_and_presence_test() {
    let (card, driver) = powered_card("sd-power.img", 64);

    // 顺序的上电/断电每一步都独立成功, 重复调用幂等
    assert!(card.power(true));
    assert!(card.power(false));
    assert!(card.power(false));
    assert!(card.power(true));

    // 断电后传输失败, 容量回到驱动定义的未上电值(本驱动为 0)
    assert!(card.power(false));
    let mut buf = vec![0u8; BLOCK_SIZE];
    assert!(!card.read(0, &mut buf));
    assert!(!card.write(0, &buf));
    assert_eq!(card.capacity(), 0);

    // 具体场景: 拔卡之后 present/power/read 全部为 false, capacity 不 panic
    driver.eject();
    assert!(!card.present());
    assert!(!card.power(true));
    assert!(!card.read(0, &mut buf));
    let _ = card.capacity();

    // 重新插卡并上电, 介质内容还在
    driver.insert();
    assert!(card.present());
    assert!(card.power(true));
    assert!(card.read(0, &mut buf));
}

#[test]
fn sd_install_driver_test() {
    // 全局安装路径: install_driver 之后 SdCard::new() 无需参数,
    // 多个句柄寻址同一张卡
    std::fs::create_dir_all("target").unwrap();
    install_driver(Arc::new(FileCard::new("target/sd-global.img", 64)));
    let card = SdCard::new();
    let other = SdCard::new();
    assert!(card.power(true));

    let src = vec![0x5Au8; BLOCK_SIZE];
    assert!(card.write(3, &src));
    let mut dst = vec![0u8; BLOCK_SIZE];
    assert!(other.read(3, &mut dst));
    assert_eq!(src, dst);
    assert!(other.power(false));
}
