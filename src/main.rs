use std::sync::Arc;

use clap::{Arg, Command};

use device::FileCard;
use sd::{install_driver, SdCard, BLOCK_SIZE};

mod device;
mod sd;
#[cfg(test)]
mod test;

fn main() {
    sdcard_exercise().expect("Error when exercising sdcard");
}

fn sdcard_exercise() -> std::io::Result<()> {
    // 从命令行参数中获取镜像路径和卡容量
    let matches = Command::new("SDCard Exerciser")
        .arg(
            // image 参数
            Arg::new("image")
                .short('i')
                .long("image")
                .default_value("target/sd.img")
                .help("Card image path on the host filesystem"),
        )
        .arg(
            // blocks 参数
            Arg::new("blocks")
                .short('n')
                .long("blocks")
                .default_value("16384")
                .help("Card capacity in 512-byte blocks"),
        )
        .arg(
            // start 参数
            Arg::new("start")
                .short('s')
                .long("start")
                .default_value("10")
                .help("First block of the write/read verify pass"),
        )
        .get_matches();

    let image = matches.get_one::<String>("image").unwrap();
    let blocks: usize = matches
        .get_one::<String>("blocks")
        .unwrap()
        .parse()
        .expect("blocks must be a number");
    let start: usize = matches
        .get_one::<String>("start")
        .unwrap()
        .parse()
        .expect("start must be a number");
    println!("image: {}\nblocks: {}", image, blocks);

    // 安装模拟驱动并创建设备句柄。这里我们在宿主机上创建文件 ./target/sd.img
    // 来模拟一张 SD 卡。安装之后 SdCard::new() 不再需要任何参数。
    install_driver(Arc::new(FileCard::new(image.as_str(), blocks)));
    let card = SdCard::new();

    println!("present: {}", card.present());
    println!("power on: {}", card.power(true));
    println!("capacity: {} bytes", card.capacity());

    // 写入三个块的随机数据, 再读回比较
    let mut src = vec![0u8; 3 * BLOCK_SIZE];
    for byte in src.iter_mut() {
        *byte = rand::random::<u8>();
    }
    println!("write at {}: {}", start, card.write(start, &src));

    let mut dst = vec![0u8; 3 * BLOCK_SIZE];
    println!("read at {}: {}", start, card.read(start, &mut dst));
    assert_eq!(src, dst, "verify failed: read back differs from written data");
    println!("verify: ok");

    println!("power off: {}", card.power(false));

    Ok(())
}
