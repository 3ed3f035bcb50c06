fn main() {
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASS");
    println!("cargo:rerun-if-env-changed=BROKER_URL");
    println!("cargo:rerun-if-env-changed=TANKPUMP_CONFIG");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
