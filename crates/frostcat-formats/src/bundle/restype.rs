//! Resource type tags

/// Texture resources
pub const RES_TYPE_TEXTURE: u32 = 0x5C49_54A6;

const RES_TYPES: &[(u32, &str)] = &[
    (RES_TYPE_TEXTURE, ".itexture"),
    (0x2D47_A5FF, ".gfx"),
    (0x22FE_8AC8, ""),
    (0x6BB6_D7D2, ".streamingstub"),
    (0x1CA3_8E06, ""),
    (0x15E1_F32E, ""),
    (0x4864_737B, ".hkdestruction"),
    (0x9104_3F65, ".hknondestruction"),
    (0x51A3_C853, ".ant"),
    (0xD070_EED1, ".animtrackdata"),
    (0x319D_8CD0, ".ragdoll"),
    (0x49B1_56D4, ".mesh"),
    (0x30B4_A553, ".occludermesh"),
    (0x5BDF_DEFE, ".lightingsystem"),
    (0x70C5_CB3E, ".enlighten"),
    (0xE156_AF73, ".probeset"),
    (0x7AEF_C446, ".staticenlighten"),
    (0x59CE_EB57, ".shaderdatabase"),
    (0x36F3_F2C0, ".shaderdb"),
    (0x10F0_E5A1, ".shaderprogramdb"),
    (0xC6DB_EE07, ".mohwspecific"),
    (0xAFEC_B022, ".luac"),
    (0x59C7_9990, ".facefx"),
    (0x1091_C8C5, ".morphtargets"),
    (0xE36F_0D59, ".clothasset"),
    (0x24A0_19CC, ".material"),
    (0x5E86_2E05, ".talktable"),
    (0x957C_32B1, ".alttexture"),
    (0x7674_2DC8, ".delayloadbundles"),
    (0xA23E_75DB, ".layercombinations"),
    (0xC6CD_3286, ".static"),
    (0xEB22_8507, ".headmoprh"),
    (0xEFC7_0728, ".zs"),
];

/// File extension for a known resource type
///
/// Some known types map to an empty extension; unknown types return `None`.
pub fn res_type_extension(res_type: u32) -> Option<&'static str> {
    RES_TYPES
        .iter()
        .find(|(tag, _)| *tag == res_type)
        .map(|(_, ext)| *ext)
}

/// Catalog text form of a resource type: its little-endian bytes in upper hex
pub fn res_type_hex(res_type: u32) -> String {
    hex::encode_upper(res_type.to_le_bytes())
}

/// Inverse of [`res_type_hex`]
pub fn parse_res_type_hex(text: &str) -> Option<u32> {
    let bytes: [u8; 4] = hex::decode(text).ok()?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}
